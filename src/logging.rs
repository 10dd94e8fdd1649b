/// Console logger for the CLI.
///
/// Maps `-v` counts onto level filters: 0 warn, 1 info, 2 debug, 3+ trace.
/// At trace the filter opens up to dependency crates as well. `RUST_LOG`
/// still wins when set.
pub fn setup_logger(verbose: u8) {
    let filter = match verbose {
        0 => "treelock=warn",
        1 => "treelock=info",
        2 => "treelock=debug",
        _ => "trace",
    };

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter));
    builder.format_target(false);
    // Timestamps only matter once lock timing is being debugged.
    if verbose >= 2 {
        builder.format_timestamp_millis();
    } else {
        builder.format_timestamp(None);
    }
    builder.init();
}
