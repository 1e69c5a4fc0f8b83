// tests/discovery.rs

use autosweep::fs::RealFileSystem;
use autosweep::sweep::{discover, DiscoveryRules};
use autosweep_test_utils::builders::ConfigFileBuilder;

fn rules() -> DiscoveryRules {
    let cfg = ConfigFileBuilder::new()
        .extensions(&["py", "sh"])
        .skip("secret_manager*.py")
        .build();
    DiscoveryRules::from_config(&cfg).unwrap()
}

#[test]
fn test_discovery_on_disk_filters_and_orders() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path();

    std::fs::write(p.join("Zeta.py"), "print('z')\n").unwrap();
    std::fs::write(p.join("alpha.py"), "print('a')\n").unwrap();
    std::fs::write(p.join("common.py"), "").unwrap();
    std::fs::write(p.join("__init__.py"), "").unwrap();
    std::fs::write(p.join("secret_manager_local.py"), "").unwrap();
    std::fs::write(p.join("notes.txt"), "not a script").unwrap();
    std::fs::write(p.join(".hidden.py"), "").unwrap();
    std::fs::create_dir(p.join("nested.py")).unwrap();
    std::fs::write(p.join("nested.py").join("inner.py"), "").unwrap();

    let names: Vec<String> = discover(&RealFileSystem, p, &rules())
        .unwrap()
        .into_iter()
        .map(|s| s.name)
        .collect();

    assert_eq!(names, vec!["alpha.py", "Zeta.py"]);
}

#[cfg(unix)]
#[test]
fn test_shell_scripts_need_the_exec_bit() {
    use autosweep_test_utils::builders::write_shell_script;

    let dir = tempfile::tempdir().unwrap();
    write_shell_script(dir.path(), "backup.sh", "exit 0");
    std::fs::write(dir.path().join("plain.sh"), "exit 0\n").unwrap();

    let found = discover(&RealFileSystem, dir.path(), &rules()).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name, "backup.sh");
    assert_eq!(found[0].interpreter, None);
}

#[test]
fn test_discovery_is_stable_across_calls() {
    let dir = tempfile::tempdir().unwrap();
    for name in ["b.py", "A.py", "a.py", "c.py"] {
        std::fs::write(dir.path().join(name), "").unwrap();
    }

    let first = discover(&RealFileSystem, dir.path(), &rules()).unwrap();
    let second = discover(&RealFileSystem, dir.path(), &rules()).unwrap();
    assert_eq!(first, second);

    let names: Vec<&str> = first.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["A.py", "a.py", "b.py", "c.py"]);
}
