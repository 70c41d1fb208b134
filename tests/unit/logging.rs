use super::*;
use tempfile::tempdir;

#[test]
fn test_init_in_writes_rolling_file_once() {
    let dir = tempdir().unwrap();

    let guard = init_in(dir.path()).expect("first init installs the subscriber");
    assert_eq!(guard.log_dir(), dir.path());

    // 全局 subscriber 只能安装一次
    assert!(init_in(dir.path()).is_none());

    tracing::info!("written through the rolling appender");
    drop(guard);
    // 恢复默认 panic hook，其余测试的失败信息仍输出到 stderr
    let _ = std::panic::take_hook();

    let names: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert!(names.iter().any(|name| name.starts_with(LOG_FILE_PREFIX)));
}
