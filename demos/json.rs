use logchain::{attr, Config, Level};

fn main() {
    let cfg = Config {
        level: Level::Info,
        console_json: true,
        ..Config::default()
    };
    if let Err(e) = logchain::configure(cfg) {
        eprintln!("configure failed: {}", e);
    }

    logchain::info(
        "request served",
        [
            attr("method", "GET"),
            attr("url", logchain::sanitize_url_str("/login?user=bob&token=abc")),
            attr("status", 200),
        ],
    );

    // Raise the level at runtime; the info line below is dropped.
    logchain::set_level(Level::Warn);
    logchain::info("not shown", []);
    logchain::warn("disk almost full", [attr("free_mb", 512)]);
}
