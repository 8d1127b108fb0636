use logchain::{attr, Config, Level};
use std::io;

fn main() {
    let dir = std::env::temp_dir().join("logchain-demo");
    let cfg = Config {
        level: Level::Debug,
        add_source: true,
        file_path: Some(dir.join("text.log")),
        file_max_size_bytes: 4 * 1024,
        file_max_backups: 3,
        stacktrace_level: Some(Level::Error),
        ..Config::from_env()
    };
    if let Err(e) = logchain::configure(cfg) {
        eprintln!("file logging disabled: {}", e);
    }
    logchain::set_redacted_keys(["password", "token"]);

    logchain::info("starting service", [attr("version", env!("CARGO_PKG_VERSION"))]);

    let api = logchain::with([attr("component", "api")]).with_group("request");
    api.info(
        "authentication failed",
        [attr("user_id", 42), attr("password", "hunter2")],
    );

    let timer = logchain::timed("cache warmup", [attr("entries", 128)]);
    for i in 0..64 {
        logchain::debug("warming", [attr("i", i)]);
    }
    timer.finish([]);

    let err = io::Error::new(io::ErrorKind::NotFound, "config.toml missing");
    logchain::error_err("cannot load config", &err, []);

    logchain::reset();
}
