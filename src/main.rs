use std::io::Write;

use anyhow::{bail, Context as _};

use blocknet::config::Config;
use blocknet::context::Context;
use blocknet::http::{HttpClient, HttpRequest, Method};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();

    let mut args = std::env::args().skip(1);
    let Some(url) = args.next() else {
        bail!("usage: blocknet <url> [METHOD]");
    };
    let method: Method = match args.next() {
        Some(m) => m.parse().with_context(|| format!("unknown method {m:?}"))?,
        None => Method::GET,
    };

    let cfg = Config::load()?;
    let ctx = Context::new();
    let client = HttpClient::from_config(&ctx, &cfg);

    let request = HttpRequest::from_url(method, &url).with_context(|| format!("invalid url {url:?}"))?;
    let (response, body) = client
        .async_send(request)
        .await
        .context("request task failed")?
        .with_context(|| format!("{method} {url}"))?;

    eprintln!("{} {} {}", response.version(), response.status(), response.reason());
    for (name, value) in response.headers() {
        eprintln!("{name}: {value}");
    }
    eprintln!();

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&body)?;
    stdout.flush()?;
    Ok(())
}
