use logchain::{Config, Level};

fn main() {
    logchain::init_tracing().expect("install tracing subscriber");
    logchain::configure(Config {
        level: Level::Debug,
        ..Config::default()
    })
    .ok();
    logchain::add_redacted_keys(["reason"]);

    tracing::info!("starting service");
    tracing::error!(
        user_id = 42,
        reason = "invalid password",
        "authentication failed"
    );
}
