use std::sync::{Arc, Barrier};

use pinwatch::workdir::{WorkingDirectoryProvider, WORKDIR_PREFIX};

#[test]
fn test_concurrent_first_access_creates_one_directory() {
    const CALLERS: usize = 16;

    let base = tempfile::tempdir().unwrap();
    let provider = Arc::new(WorkingDirectoryProvider::with_base(base.path()));
    let barrier = Arc::new(Barrier::new(CALLERS));

    let handles: Vec<_> = (0..CALLERS)
        .map(|_| {
            let provider = Arc::clone(&provider);
            let barrier = Arc::clone(&barrier);
            std::thread::spawn(move || {
                barrier.wait();
                provider.get().unwrap()
            })
        })
        .collect();
    let paths: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert!(paths.windows(2).all(|w| w[0] == w[1]));

    let created: Vec<_> = std::fs::read_dir(base.path())
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.is_dir())
        .collect();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0], paths[0]);
    assert!(created[0]
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with(WORKDIR_PREFIX));
}

#[test]
fn test_directory_outlives_provider() {
    let base = tempfile::tempdir().unwrap();
    let path = {
        let provider = WorkingDirectoryProvider::with_base(base.path());
        provider.get().unwrap()
    };
    assert!(path.is_dir());
}
