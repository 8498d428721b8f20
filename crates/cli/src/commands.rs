use eyre::WrapErr;
use pageconf_config::loader::ConfigLoader;
use std::path::PathBuf;
use tracing::error;

/// Run a resolution pass and print the result as JSON on stdout.
///
/// In dev mode a failed pass is reported on stderr and the process exits
/// cleanly, so a watching dev-server keeps running while the user fixes
/// their declaration files. In build mode the error propagates and the
/// process exits non-zero.
pub async fn resolve(root: Option<PathBuf>, dev: bool, pretty: bool) -> eyre::Result<()> {
    let mut loader = ConfigLoader::new();
    if let Some(root) = root {
        loader = loader.root(root);
    }

    let resolution = match loader.load().await {
        Ok(resolution) => resolution,
        Err(err) if dev => {
            error!("resolution pass failed: {err}");
            println!("null");
            return Ok(());
        }
        Err(err) => return Err(err).wrap_err("resolution pass failed"),
    };

    let output = if pretty {
        serde_json::to_string_pretty(&resolution)
    } else {
        serde_json::to_string(&resolution)
    }
    .wrap_err("failed to serialize the resolved configuration")?;
    println!("{output}");
    Ok(())
}
