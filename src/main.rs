/// Prints a JSON stats snapshot of one cgroup.
///
/// The only argument is the cgroup path relative to the hierarchy root, e.g.
/// `system.slice/docker-<id>.scope`; without it the root cgroup is read. Set
/// `ROOTFS_MOUNT_PATH` when the host root is mounted elsewhere, e.g. inside a container.
///
/// # Errors
///
/// Returns an error if the cgroup hierarchy cannot be detected, the cgroup does not exist,
/// or none of its stat domains could be read.
///
/// # Examples
///
/// ```bash
/// RUST_LOG=debug cgroup-stats system.slice/docker-0123abcd.scope
/// ```
fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let relative_path = std::env::args().nth(1).unwrap_or_default();
    let config = cgroup_stats::Config::from_env();
    log::debug!("Using {:?}", config);

    let Some(stats) = cgroup_stats::snapshot(&config, &relative_path)? else {
        return Err(format!("no stats could be read for cgroup `{relative_path}`").into());
    };

    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, &stats)?;
    std::io::Write::write_all(&mut stdout, b"\n")?;
    Ok(())
}
