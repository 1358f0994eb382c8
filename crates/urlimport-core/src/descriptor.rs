//! Module descriptors.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a resolved module's source lives.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModuleDescriptor {
    /// Module name as requested by the importer.
    pub name: String,
    /// URL the source is fetched from.
    pub origin: String,
}

impl ModuleDescriptor {
    /// Build a descriptor for `name` under `root`.
    ///
    /// The origin is plain concatenation: `root + "/" + name + "." + extension`.
    pub fn new(root: &str, name: &str, extension: &str) -> Self {
        Self {
            name: name.to_string(),
            origin: format!("{}/{}.{}", root, name, extension),
        }
    }
}

impl fmt::Display for ModuleDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.origin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_is_not_normalized() {
        let descriptor = ModuleDescriptor::new("http://localhost:8000/", "pkg", "py");
        assert_eq!(descriptor.origin, "http://localhost:8000//pkg.py");
    }
}
