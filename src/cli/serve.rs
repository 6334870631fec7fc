//! `assetkit serve`: static file server over the web root.
//!
//! Every request is answered from disk first; the [`DumpHook`] then runs on
//! the same worker, so the next request sees freshly dumped assets.

use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use percent_encoding::percent_decode_str;
use tiny_http::{Header, Method, Request, Response, Server, StatusCode};

use crate::config::PipelineConfig;
use crate::context::BuildContext;
use crate::hooks::DumpHook;
use crate::utils::mime;
use crate::{debug, log};

/// Maximum number of port binding attempts.
const MAX_PORT_RETRIES: u16 = 10;

/// Request worker threads.
const WORKERS: usize = 4;

/// Bind, dump once, then serve until the process is stopped.
pub fn serve_assets(config: &PipelineConfig) -> Result<()> {
    let ctx = Arc::new(BuildContext::from_config(config)?);
    let hook = DumpHook::new(Arc::clone(&ctx));

    fs::create_dir_all(ctx.web_root())
        .with_context(|| format!("Failed to create {}", ctx.web_root().display()))?;

    let report = ctx.dump();
    for failure in &report.failures {
        log!("failed"; "{}", failure);
    }
    log!("dump"; "{}", report.summary());

    let (server, addr) = bind_with_retry(config.serve.interface, config.serve.port)?;
    log!("serve"; "http://{}", addr);
    if !hook.is_enabled() {
        log!("serve"; "auto dump disabled");
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(WORKERS)
        .build()
        .context("Failed to create request thread pool")?;

    let web_root = Arc::new(ctx.web_root().to_path_buf());
    for request in server.incoming_requests() {
        let hook = hook.clone();
        let web_root = Arc::clone(&web_root);
        pool.spawn(move || {
            if let Err(e) = handle_request(request, &web_root) {
                log!("serve"; "request error: {e}");
            }
            hook.after_request();
        });
    }
    Ok(())
}

/// Bind to the specified interface and port, with automatic port retry.
pub fn bind_with_retry(interface: IpAddr, base_port: u16) -> Result<(Server, SocketAddr)> {
    let mut last_error = None;
    for offset in 0..MAX_PORT_RETRIES {
        let port = base_port.saturating_add(offset);
        let addr = SocketAddr::new(interface, port);

        match Server::http(addr) {
            Ok(server) => {
                if offset > 0 {
                    log!("serve"; "port {} in use, using {} instead", base_port, port);
                }
                return Ok((server, addr));
            }
            Err(e) => last_error = Some(e),
        }
    }
    Err(anyhow!(
        "Failed to bind after {} attempts (ports {}-{}): {}",
        MAX_PORT_RETRIES,
        base_port,
        base_port.saturating_add(MAX_PORT_RETRIES - 1),
        last_error.map(|e| e.to_string()).unwrap_or_default()
    ))
}

fn handle_request(request: Request, web_root: &Path) -> Result<()> {
    if !matches!(request.method(), Method::Get | Method::Head) {
        return respond_status(request, 405, "Method Not Allowed");
    }

    let Some(path) = resolve_path(request.url(), web_root) else {
        debug!("serve"; "404 {}", request.url());
        return respond_status(request, 404, "Not Found");
    };

    let content_type = mime::from_path(&path);
    let body = fs::read(&path).with_context(|| format!("Failed to read {}", path.display()))?;

    // tiny_http drops the body of HEAD responses itself
    let response = Response::from_data(body)
        .with_status_code(StatusCode(200))
        .with_header(content_type_header(content_type)?);
    request.respond(response)?;
    Ok(())
}

fn respond_status(request: Request, code: u16, message: &str) -> Result<()> {
    let response = Response::from_string(message)
        .with_status_code(code)
        .with_header(content_type_header(mime::types::PLAIN)?);
    request.respond(response)?;
    Ok(())
}

fn content_type_header(value: &str) -> Result<Header> {
    Header::from_bytes("Content-Type", value).map_err(|()| anyhow!("invalid header value"))
}

/// Map a request URL onto a file under `web_root`.
///
/// Query strings are dropped and `%XX` escapes are decoded. Directories
/// resolve to `index.html`. The final path is canonicalized, so neither
/// `..` nor a symlink can leave the web root.
fn resolve_path(url: &str, web_root: &Path) -> Option<PathBuf> {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    let decoded = percent_decode_str(path).decode_utf8().ok()?;

    let mut local = web_root.to_path_buf();
    for component in Path::new(decoded.trim_start_matches('/')).components() {
        match component {
            Component::Normal(part) => local.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    if local.is_dir() {
        local.push("index.html");
    }

    let canonical = local.canonicalize().ok()?;
    let root_canonical = web_root.canonicalize().ok()?;
    if !canonical.starts_with(&root_canonical) {
        return None;
    }
    canonical.is_file().then_some(canonical)
}
