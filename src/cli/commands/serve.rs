//! Web server command.

use console::style;

use crate::config::Settings;

/// Default port when the bind address names only a host.
const DEFAULT_PORT: u16 = 3000;

/// Start the web server.
pub async fn cmd_serve(settings: &Settings, bind: &str) -> anyhow::Result<()> {
    let (host, port) = parse_bind_address(bind);
    let addr = format!("{}:{}", host, port);

    println!(
        "{} Starting shelfscan server at http://{}",
        style("→").cyan(),
        addr
    );
    println!("  Fetching with the {} transport", settings.scraper.transport.as_str());
    println!("  Press Ctrl+C to stop");

    crate::server::serve(settings, &addr).await
}

/// Parse a bind address that can be:
/// - Just a port: "3000" -> 127.0.0.1:3000
/// - Just a host: "0.0.0.0" -> 0.0.0.0:3000
/// - Host and port: "0.0.0.0:3000"
fn parse_bind_address(bind: &str) -> (String, u16) {
    if let Ok(port) = bind.parse::<u16>() {
        return ("127.0.0.1".to_string(), port);
    }

    if let Some((host, port_str)) = bind.rsplit_once(':') {
        if let Ok(port) = port_str.parse::<u16>() {
            return (host.to_string(), port);
        }
    }

    (bind.to_string(), DEFAULT_PORT)
}
