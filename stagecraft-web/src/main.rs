#[cfg(not(target_arch = "wasm32"))]
fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[macroquad::main("Stagecraft")]
async fn main() {
    #[cfg(not(target_arch = "wasm32"))]
    init_tracing();
    stagecraft_web_lib::run().await;
}
