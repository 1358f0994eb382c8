//! End-to-end imports over real HTTP against a local test server.

use integration_tests::TestServer;
use std::sync::Arc;
use urlimport_core::{
    HttpFetcher, ImportConfig, ImportError, Importer, RemoteLoader, UrlLocator,
};
use urlimport_script::{Capabilities, CapturedOutput, ErrorKind, ScriptEngine, ScriptError, Value};

const REMOTE_PACK: &str = "\
# Served by the test server
greeting = 'hello from remotePack'

def fun():
    print(greeting)
    return 42

def add(a, b=10):
    return a + b
";

type TestImporter = Importer<RemoteLoader<Arc<HttpFetcher>, ScriptEngine>>;

fn importer(server: &TestServer, output: &CapturedOutput) -> anyhow::Result<TestImporter> {
    let fetcher = Arc::new(HttpFetcher::with_defaults()?);
    let engine = ScriptEngine::new(Capabilities::none().with_output(output.clone()));

    Ok(Importer::new(RemoteLoader::new(fetcher.clone(), engine))
        .with_hook(Box::new(UrlLocator::new(fetcher)))
        .with_roots([server.url()]))
}

fn serve_remote_pack() -> anyhow::Result<TestServer> {
    let server = TestServer::start()?;
    server.serve_listing(&["remotePack", "broken"]);
    server.serve_module("remotePack", REMOTE_PACK);
    Ok(server)
}

#[test]
fn test_import_and_call_remote_module() -> anyhow::Result<()> {
    let server = serve_remote_pack()?;
    let output = CapturedOutput::new();
    let mut importer = importer(&server, &output)?;

    let module = importer.import("remotePack")?;
    assert_eq!(module.origin(), format!("{}/remotePack.py", server.url()));
    assert_eq!(
        module.namespace.names().collect::<Vec<_>>(),
        vec!["greeting", "fun", "add"]
    );

    let engine = importer.loader().engine();
    assert_eq!(engine.call(&module.namespace, "fun", vec![])?, Value::Int(42));
    assert_eq!(
        engine.call(&module.namespace, "add", vec![Value::Int(5)])?,
        Value::Int(15)
    );
    assert_eq!(output.contents(), "hello from remotePack\n");
    Ok(())
}

#[test]
fn test_listing_fetched_once_modules_every_time() -> anyhow::Result<()> {
    let server = serve_remote_pack()?;
    let output = CapturedOutput::new();
    let mut importer = importer(&server, &output)?;

    importer.import("remotePack")?;
    importer.import("remotePack")?;

    assert_eq!(
        server.requests(),
        vec!["/", "/remotePack.py", "/remotePack.py"]
    );
    Ok(())
}

#[test]
fn test_find_does_not_fetch_module() -> anyhow::Result<()> {
    let server = serve_remote_pack()?;
    let output = CapturedOutput::new();
    let mut importer = importer(&server, &output)?;

    let first = importer.find("remotePack")?.expect("remotePack is listed");
    let second = importer.find("remotePack")?.expect("remotePack is listed");
    assert_eq!(first, second);
    assert!(importer.find("unlisted")?.is_none());
    assert_eq!(server.requests(), vec!["/"]);
    Ok(())
}

#[test]
fn test_unknown_module_not_found() -> anyhow::Result<()> {
    let server = serve_remote_pack()?;
    let output = CapturedOutput::new();
    let mut importer = importer(&server, &output)?;

    let err = importer.import("absent").unwrap_err();
    assert!(matches!(err, ImportError::ModuleNotFound(ref name) if name == "absent"));
    Ok(())
}

#[test]
fn test_listed_but_missing_module_is_http_error() -> anyhow::Result<()> {
    let server = serve_remote_pack()?;
    let output = CapturedOutput::new();
    let mut importer = importer(&server, &output)?;

    match importer.import("broken") {
        Err(ImportError::Http { status, url, .. }) => {
            assert_eq!(status, 404);
            assert_eq!(url, format!("{}/broken.py", server.url()));
        }
        other => panic!("expected HTTP 404, got {other:?}"),
    }
    Ok(())
}

#[test]
fn test_runtime_error_is_attributed_to_origin() -> anyhow::Result<()> {
    let server = serve_remote_pack()?;
    server.serve_module("broken", "x = 1\ny = x / 0\n");
    let output = CapturedOutput::new();
    let mut importer = importer(&server, &output)?;

    let err = importer.import("broken").unwrap_err();
    let ImportError::Execution { origin, source } = err else {
        panic!("expected an execution error, got {err:?}");
    };
    assert_eq!(origin, format!("{}/broken.py", server.url()));

    let script = source
        .downcast_ref::<ScriptError>()
        .expect("engine errors are script errors");
    assert_eq!(script.kind(), Some(ErrorKind::ZeroDivisionError));
    assert_eq!(script.line(), Some(2));
    Ok(())
}

#[test]
fn test_import_statement_rejected() -> anyhow::Result<()> {
    let server = serve_remote_pack()?;
    server.serve_module("broken", "import os\nos.system('true')\n");
    let output = CapturedOutput::new();
    let mut importer = importer(&server, &output)?;

    let err = importer.import("broken").unwrap_err();
    let ImportError::Execution { source, .. } = err else {
        panic!("expected an execution error, got {err:?}");
    };
    assert!(matches!(
        source.downcast_ref::<ScriptError>(),
        Some(ScriptError::Syntax { .. })
    ));
    Ok(())
}

#[test]
fn test_invalid_utf8_source() -> anyhow::Result<()> {
    let server = serve_remote_pack()?;
    server.serve("/broken.py", vec![0x66, 0x6f, 0xff, 0xfe]);
    let output = CapturedOutput::new();
    let mut importer = importer(&server, &output)?;

    let err = importer.import("broken").unwrap_err();
    assert!(matches!(err, ImportError::InvalidSource { .. }));
    Ok(())
}

#[test]
fn test_listing_failure_aborts_import() -> anyhow::Result<()> {
    let server = TestServer::start()?;
    server.serve_status("/", 500, "boom");
    let output = CapturedOutput::new();
    let mut importer = importer(&server, &output)?;

    let err = importer.import("remotePack").unwrap_err();
    assert!(matches!(err, ImportError::Http { status: 500, .. }));
    Ok(())
}

#[test]
fn test_unreachable_root_is_network_error() -> anyhow::Result<()> {
    let url = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
        format!("http://{}", listener.local_addr()?)
    };
    let fetcher = Arc::new(HttpFetcher::with_defaults()?);
    let locator = UrlLocator::new(fetcher);

    // The listener is dropped; nothing accepts on its port any more.
    let err = locator.locate_url(&url).unwrap_err();
    assert!(matches!(err, ImportError::Network(_)), "got {err:?}");
    Ok(())
}

#[test]
fn test_denied_root_is_not_fetched() -> anyhow::Result<()> {
    let server = serve_remote_pack()?;
    let mut config = ImportConfig::default();
    config.deny = vec!["http://127.0.0.1*".to_string()];

    let fetcher = Arc::new(HttpFetcher::with_defaults()?);
    let locator = UrlLocator::with_config(fetcher, config);

    let err = locator.locate_url(&server.url()).unwrap_err();
    assert!(matches!(err, ImportError::NotAllowed(_)));
    assert!(server.requests().is_empty());
    Ok(())
}
