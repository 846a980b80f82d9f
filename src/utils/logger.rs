use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// `RUST_LOG` 優先；否則 verbose 時開啟本 crate 的 debug
fn default_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose {
            "synesthesia=debug,info"
        } else {
            "synesthesia=info"
        })
    })
}

/// 初始化全域 subscriber；`json` 時輸出一行一筆 JSON，供容器內的收集器解析
pub fn init_logger(verbose: bool, json: bool) {
    let json_layer = json.then(|| fmt::layer().with_target(false).json());
    let compact_layer = (!json).then(|| fmt::layer().with_target(false).compact());

    tracing_subscriber::registry()
        .with(default_filter(verbose))
        .with(json_layer)
        .with(compact_layer)
        .init();
}
