//! Builtin functions available to every module.

use crate::capabilities::{Budget, Capabilities};
use crate::error::{ErrorKind, Fault};
use crate::ast::CmpOp;
use crate::value::{compare, Value, MAX_SEQUENCE_LEN};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Print,
    Len,
    Str,
    Int,
    Float,
    Bool,
    Range,
    Abs,
    Min,
    Max,
}

const ALL: [Builtin; 10] = [
    Builtin::Print,
    Builtin::Len,
    Builtin::Str,
    Builtin::Int,
    Builtin::Float,
    Builtin::Bool,
    Builtin::Range,
    Builtin::Abs,
    Builtin::Min,
    Builtin::Max,
];

impl Builtin {
    pub fn name(self) -> &'static str {
        match self {
            Builtin::Print => "print",
            Builtin::Len => "len",
            Builtin::Str => "str",
            Builtin::Int => "int",
            Builtin::Float => "float",
            Builtin::Bool => "bool",
            Builtin::Range => "range",
            Builtin::Abs => "abs",
            Builtin::Min => "min",
            Builtin::Max => "max",
        }
    }

    pub fn lookup(name: &str) -> Option<Builtin> {
        ALL.into_iter().find(|b| b.name() == name)
    }

    pub(crate) fn call(
        self,
        args: &[Value],
        caps: &Capabilities,
        budget: &mut Budget,
    ) -> Result<Value, Fault> {
        match self {
            Builtin::Print => {
                let mut line = String::new();
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        line.push(' ');
                    }
                    line.push_str(&arg.render()?);
                    if line.len() > MAX_SEQUENCE_LEN {
                        return Err(Fault::new(
                            ErrorKind::MemoryError,
                            "printed line is too large",
                        ));
                    }
                }
                line.push('\n');
                caps.write_output(&line)?;
                Ok(Value::None)
            }
            Builtin::Len => {
                let [value] = self.exactly::<1>(args)?;
                let len = match value {
                    Value::Str(s) => s.chars().count(),
                    Value::List(items) => items.len(),
                    other => {
                        return Err(Fault::type_error(format!(
                            "object of type '{}' has no len()",
                            other.type_name()
                        )));
                    }
                };
                i64::try_from(len).map(Value::Int).map_err(|_| Fault::overflow())
            }
            Builtin::Str => match self.at_most::<1>(args)? {
                [] => Ok(Value::from("")),
                [value] => value.render().map(Value::from),
                _ => too_many_arguments(self),
            },
            Builtin::Int => match self.at_most::<1>(args)? {
                [] => Ok(Value::Int(0)),
                [value] => to_int(value),
                _ => too_many_arguments(self),
            },
            Builtin::Float => match self.at_most::<1>(args)? {
                [] => Ok(Value::Float(0.0)),
                [value] => to_float(value),
                _ => too_many_arguments(self),
            },
            Builtin::Bool => match self.at_most::<1>(args)? {
                [] => Ok(Value::Bool(false)),
                [value] => Ok(Value::Bool(value.is_truthy())),
                _ => too_many_arguments(self),
            },
            Builtin::Range => range(args, budget),
            Builtin::Abs => {
                let [value] = self.exactly::<1>(args)?;
                match value {
                    Value::Float(f) => Ok(Value::Float(f.abs())),
                    other => match other.as_int() {
                        Some(i) => i.checked_abs().map(Value::Int).ok_or_else(Fault::overflow),
                        None => Err(Fault::type_error(format!(
                            "bad operand type for abs(): '{}'",
                            other.type_name()
                        ))),
                    },
                }
            }
            Builtin::Min => extreme(self, args, CmpOp::Lt),
            Builtin::Max => extreme(self, args, CmpOp::Gt),
        }
    }

    fn exactly<'a, const N: usize>(self, args: &'a [Value]) -> Result<&'a [Value; N], Fault> {
        args.try_into().map_err(|_| {
            Fault::type_error(format!(
                "{}() takes exactly {} argument{} ({} given)",
                self.name(),
                N,
                if N == 1 { "" } else { "s" },
                args.len()
            ))
        })
    }

    fn at_most<const N: usize>(self, args: &[Value]) -> Result<&[Value], Fault> {
        if args.len() > N {
            return Err(Fault::type_error(format!(
                "{}() takes at most {} argument{} ({} given)",
                self.name(),
                N,
                if N == 1 { "" } else { "s" },
                args.len()
            )));
        }
        Ok(args)
    }
}

fn too_many_arguments(builtin: Builtin) -> Result<Value, Fault> {
    Err(Fault::type_error(format!(
        "{}() received too many arguments",
        builtin.name()
    )))
}

fn to_int(value: &Value) -> Result<Value, Fault> {
    match value {
        Value::Float(f) => {
            if f.is_nan() {
                return Err(Fault::value_error("cannot convert float NaN to integer"));
            }
            if f.is_infinite() {
                return Err(Fault::new(
                    ErrorKind::OverflowError,
                    "cannot convert float infinity to integer",
                ));
            }
            let truncated = f.trunc();
            if truncated < i64::MIN as f64 || truncated >= i64::MAX as f64 {
                return Err(Fault::overflow());
            }
            Ok(Value::Int(truncated as i64))
        }
        Value::Str(s) => s
            .trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| {
                Fault::value_error(format!(
                    "invalid literal for int() with base 10: {}",
                    value.repr()
                ))
            }),
        other => other.as_int().map(Value::Int).ok_or_else(|| {
            Fault::type_error(format!(
                "int() argument must be a string or a number, not '{}'",
                other.type_name()
            ))
        }),
    }
}

fn to_float(value: &Value) -> Result<Value, Fault> {
    match value {
        Value::Float(f) => Ok(Value::Float(*f)),
        Value::Str(s) => s.trim().parse::<f64>().map(Value::Float).map_err(|_| {
            Fault::value_error(format!(
                "could not convert string to float: {}",
                value.repr()
            ))
        }),
        other => other
            .as_int()
            .map(|i| Value::Float(i as f64))
            .ok_or_else(|| {
                Fault::type_error(format!(
                    "float() argument must be a string or a number, not '{}'",
                    other.type_name()
                ))
            }),
    }
}

fn range(args: &[Value], budget: &mut Budget) -> Result<Value, Fault> {
    let mut bounds = Vec::with_capacity(args.len());
    for arg in args {
        let bound = arg.as_int().ok_or_else(|| {
            Fault::type_error(format!(
                "'{}' object cannot be interpreted as an integer",
                arg.type_name()
            ))
        })?;
        bounds.push(bound);
    }

    let (start, stop, step) = match bounds.as_slice() {
        [stop] => (0, *stop, 1),
        [start, stop] => (*start, *stop, 1),
        [start, stop, step] => (*start, *stop, *step),
        _ => {
            return Err(Fault::type_error(format!(
                "range expected 1 to 3 arguments, got {}",
                args.len()
            )));
        }
    };
    if step == 0 {
        return Err(Fault::value_error("range() arg 3 must not be zero"));
    }

    let span = if step > 0 {
        i128::from(stop) - i128::from(start)
    } else {
        i128::from(start) - i128::from(stop)
    };
    let step_size = i128::from(step).abs();
    let count = if span <= 0 {
        0
    } else {
        (span + step_size - 1) / step_size
    };

    if count > MAX_SEQUENCE_LEN as i128 {
        return Err(Fault::new(ErrorKind::MemoryError, "range is too large"));
    }
    budget.charge(count as u64)?;

    let items: Vec<Value> = (0..count)
        .map(|i| Value::Int((i128::from(start) + i * i128::from(step)) as i64))
        .collect();
    Ok(Value::from(items))
}

fn extreme(builtin: Builtin, args: &[Value], op: CmpOp) -> Result<Value, Fault> {
    let candidates = match args {
        [] => {
            return Err(Fault::type_error(format!(
                "{} expected at least 1 argument, got 0",
                builtin.name()
            )));
        }
        [single] => single.iterate()?,
        many => many.to_vec(),
    };

    let mut iter = candidates.into_iter();
    let Some(mut best) = iter.next() else {
        return Err(Fault::value_error(format!(
            "{}() arg is an empty sequence",
            builtin.name()
        )));
    };
    for candidate in iter {
        if compare(op, &candidate, &best)? {
            best = candidate;
        }
    }
    Ok(best)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::CapturedOutput;
    use rstest::rstest;

    fn call(builtin: Builtin, args: Vec<Value>) -> Result<Value, Fault> {
        let mut budget = Budget::new(Some(1_000));
        builtin.call(&args, &Capabilities::none(), &mut budget)
    }

    fn ints(values: &[i64]) -> Value {
        Value::from(values.iter().copied().map(Value::Int).collect::<Vec<_>>())
    }

    #[test]
    fn test_lookup() {
        assert_eq!(Builtin::lookup("len"), Some(Builtin::Len));
        assert_eq!(Builtin::lookup("open"), None);
        assert_eq!(Builtin::lookup("__import__"), None);
    }

    #[test]
    fn test_print_writes_through_sink() {
        let captured = CapturedOutput::new();
        let caps = Capabilities::none().with_output(captured.clone());
        let mut budget = Budget::new(None);

        Builtin::Print
            .call(&[Value::from("a"), Value::Int(1), ints(&[2])], &caps, &mut budget)
            .unwrap();
        Builtin::Print.call(&[], &caps, &mut budget).unwrap();
        assert_eq!(captured.contents(), "a 1 [2]\n\n");
    }

    #[test]
    fn test_print_without_capability() {
        let err = call(Builtin::Print, vec![Value::from("x")]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::PermissionError);
    }

    #[rstest]
    #[case(Builtin::Len, vec![Value::from("héllo")], Value::Int(5))]
    #[case(Builtin::Len, vec![ints(&[1, 2])], Value::Int(2))]
    #[case(Builtin::Str, vec![Value::Float(2.0)], Value::from("2.0"))]
    #[case(Builtin::Str, vec![], Value::from(""))]
    #[case(Builtin::Int, vec![Value::from(" 42 ")], Value::Int(42))]
    #[case(Builtin::Int, vec![Value::Float(-2.7)], Value::Int(-2))]
    #[case(Builtin::Float, vec![Value::from("1.5")], Value::Float(1.5))]
    #[case(Builtin::Bool, vec![Value::from("")], Value::Bool(false))]
    #[case(Builtin::Abs, vec![Value::Int(-3)], Value::Int(3))]
    #[case(Builtin::Min, vec![Value::Int(3), Value::Int(1), Value::Int(2)], Value::Int(1))]
    #[case(Builtin::Max, vec![ints(&[3, 9, 2])], Value::Int(9))]
    #[case(Builtin::Max, vec![Value::from("b"), Value::from("a")], Value::from("b"))]
    #[case(Builtin::Range, vec![Value::Int(3)], ints(&[0, 1, 2]))]
    #[case(Builtin::Range, vec![Value::Int(1), Value::Int(7), Value::Int(3)], ints(&[1, 4]))]
    #[case(Builtin::Range, vec![Value::Int(3), Value::Int(0), Value::Int(-1)], ints(&[3, 2, 1]))]
    #[case(Builtin::Range, vec![Value::Int(5), Value::Int(1)], ints(&[]))]
    fn test_builtin_results(
        #[case] builtin: Builtin,
        #[case] args: Vec<Value>,
        #[case] expected: Value,
    ) {
        assert_eq!(call(builtin, args).unwrap(), expected);
    }

    #[rstest]
    #[case(Builtin::Len, vec![Value::Int(1)], "object of type 'int' has no len()")]
    #[case(Builtin::Len, vec![], "len() takes exactly 1 argument (0 given)")]
    #[case(Builtin::Int, vec![Value::from("abc")], "invalid literal for int() with base 10: 'abc'")]
    #[case(Builtin::Float, vec![Value::from("x")], "could not convert string to float: 'x'")]
    #[case(Builtin::Range, vec![Value::Int(1), Value::Int(2), Value::Int(0)], "range() arg 3 must not be zero")]
    #[case(Builtin::Min, vec![ints(&[])], "min() arg is an empty sequence")]
    #[case(Builtin::Str, vec![Value::None, Value::None], "str() takes at most 1 argument (2 given)")]
    fn test_builtin_faults(
        #[case] builtin: Builtin,
        #[case] args: Vec<Value>,
        #[case] message: &str,
    ) {
        assert_eq!(call(builtin, args).unwrap_err().message, message);
    }

    #[test]
    fn test_range_charges_budget() {
        let mut budget = Budget::new(Some(10));
        let err = Builtin::Range
            .call(&[Value::Int(100)], &Capabilities::none(), &mut budget)
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::StepLimitError);
    }
}
