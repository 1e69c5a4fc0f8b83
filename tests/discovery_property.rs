// tests/discovery_property.rs

use std::collections::BTreeSet;
use std::path::Path;

use proptest::prelude::*;
use autosweep::fs::mock::MockFileSystem;
use autosweep::sweep::{discover, DiscoveryRules};
use autosweep_test_utils::builders::ConfigFileBuilder;

// File names mixing case, runnable and non-runnable extensions.
fn file_names() -> impl Strategy<Value = BTreeSet<String>> {
    proptest::collection::btree_set("[a-zA-Z][a-zA-Z0-9_]{0,8}\\.(py|sh|txt|PY)", 0..24)
}

proptest! {
    #[test]
    fn discovery_is_deterministic_and_sorted(names in file_names(), exec_mask in any::<u32>()) {
        let fs = MockFileSystem::new();
        let folder = Path::new("scripts");
        fs.add_dir(folder);
        for (i, name) in names.iter().enumerate() {
            if exec_mask & (1 << (i % 32)) != 0 {
                fs.add_executable(folder.join(name), "");
            } else {
                fs.add_file(folder.join(name), "");
            }
        }

        let rules = DiscoveryRules::from_config(
            &ConfigFileBuilder::new().extensions(&["py", "sh"]).no_skip().build(),
        )
        .unwrap();

        let first = discover(&fs, folder, &rules).unwrap();
        let second = discover(&fs, folder, &rules).unwrap();
        prop_assert_eq!(&first, &second);

        for pair in first.windows(2) {
            let (a, b) = (&pair[0].name, &pair[1].name);
            prop_assert!(
                (a.to_lowercase(), a) < (b.to_lowercase(), b),
                "{} sorted before {}", a, b
            );
        }

        for entry in &first {
            let ext = Path::new(&entry.name).extension().unwrap().to_string_lossy().to_lowercase();
            prop_assert!(ext == "py" || ext == "sh");
            if ext == "sh" {
                prop_assert!(entry.interpreter.is_none());
            } else {
                prop_assert_eq!(entry.interpreter.as_deref(), Some("python3"));
            }
        }
    }
}
