use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

pub struct TestProject {
    pub root: TempDir,
}

impl TestProject {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        Self { root }
    }

    pub fn path(&self) -> PathBuf {
        self.root.path().to_path_buf()
    }

    /// スタックのルート（まだ存在しない）
    pub fn stack_root(&self) -> PathBuf {
        self.root.path().join("astro")
    }

    /// スタックのルートをこのディレクトリ配下に向けた astro.yaml
    pub fn write_settings(&self) -> PathBuf {
        let path = self.root.path().join("astro.yaml");
        fs::write(
            &path,
            format!(
                "root: {}\nserver_address: 192.168.1.50\n",
                self.stack_root().display()
            ),
        )
        .unwrap();
        path
    }

    pub fn write_answers(&self, content: &str) -> PathBuf {
        let path = self.root.path().join("answers.yaml");
        fs::write(&path, content).unwrap();
        path
    }
}
