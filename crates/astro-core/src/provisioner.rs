//! ファイルシステムのプロビジョニング
//!
//! スタックが参照するディレクトリを作成し、生成したドキュメントを配置します。
//! 既存のファイルやディレクトリは削除も変更もしません。

use crate::error::{AstroError, Result};
use crate::layout::{ANSWERS_FILE, StackConfig};
use crate::model::{Answers, StackPlan};
use crate::render::RenderedStack;
use nix::unistd::{Gid, Uid, chown, geteuid};
use std::fs;
use std::io::ErrorKind;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// 新規作成したディレクトリのパーミッション
pub const DIR_MODE: u32 = 0o755;

const TEMP_SUFFIX: &str = ".astro-tmp";

/// プロビジョニングの結果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvisionReport {
    /// 新規作成したディレクトリ
    pub created_dirs: Vec<PathBuf>,
    /// 書き込んだファイル
    pub installed: Vec<PathBuf>,
    /// 内容が同じだったので書き込まなかったファイル
    pub unchanged: Vec<PathBuf>,
}

pub struct Provisioner<'a> {
    config: &'a StackConfig,
    /// root で実行しているときだけ chown する
    owner: Option<(Uid, Gid)>,
}

impl<'a> Provisioner<'a> {
    pub fn new(config: &'a StackConfig) -> Self {
        let owner = geteuid()
            .is_root()
            .then(|| (Uid::from_raw(config.puid), Gid::from_raw(config.pgid)));
        Self { config, owner }
    }

    /// ディレクトリ構成を整え、生成物を配置する
    pub fn provision(&self, plan: &StackPlan, rendered: &RenderedStack) -> Result<ProvisionReport> {
        let mut report = ProvisionReport::default();

        for dir in self.required_dirs(plan) {
            self.ensure_dir(&dir, &mut report)?;
        }

        for (relative, contents) in rendered.files() {
            self.install(relative, contents, &mut report)?;
        }

        info!(
            root = %self.config.root.display(),
            created = report.created_dirs.len(),
            installed = report.installed.len(),
            unchanged = report.unchanged.len(),
            "Provisioned stack directory"
        );

        Ok(report)
    }

    /// 回答ファイルを保存（次回の既定値になる）
    pub fn save_answers(&self, answers: &Answers) -> Result<PathBuf> {
        let mut report = ProvisionReport::default();
        self.ensure_dir(&self.config.root, &mut report)?;
        self.install(Path::new(ANSWERS_FILE), &answers.to_yaml()?, &mut report)?;
        Ok(self.config.answers_path())
    }

    /// 作成が必要なディレクトリ（固定レイアウト + ルート配下のボリューム）
    pub fn required_dirs(&self, plan: &StackPlan) -> Vec<PathBuf> {
        let mut dirs = self.config.fixed_layout();
        for volume in plan.services.iter().flat_map(|s| &s.volumes) {
            if self.config.owns(&volume.host) && !dirs.contains(&volume.host) {
                dirs.push(volume.host.clone());
            }
        }
        dirs
    }

    fn ensure_dir(&self, path: &Path, report: &mut ProvisionReport) -> Result<()> {
        let mut missing = Vec::new();

        for ancestor in path.ancestors() {
            match fs::metadata(ancestor) {
                Ok(meta) if meta.is_dir() => break,
                Ok(_) => {
                    return Err(path_error(
                        ancestor,
                        "ディレクトリではないファイルが存在します",
                    ));
                }
                Err(e) if e.kind() == ErrorKind::NotFound => missing.push(ancestor),
                Err(e) => return Err(path_error(ancestor, e)),
            }
        }

        for dir in missing.into_iter().rev() {
            fs::create_dir(dir).map_err(|e| path_error(dir, e))?;
            fs::set_permissions(dir, fs::Permissions::from_mode(DIR_MODE))
                .map_err(|e| path_error(dir, e))?;
            self.take_ownership(dir)?;
            debug!(path = %dir.display(), "Created directory");
            report.created_dirs.push(dir.to_path_buf());
        }

        Ok(())
    }

    /// 一時ファイルに書いてから rename で置き換える
    fn install(&self, relative: &Path, contents: &str, report: &mut ProvisionReport) -> Result<()> {
        let target = self.config.root.join(relative);
        if let Some(parent) = target.parent() {
            self.ensure_dir(parent, report)?;
        }

        match fs::metadata(&target) {
            Ok(meta) if meta.is_dir() => {
                return Err(path_error(&target, "同名のディレクトリが存在します"));
            }
            Ok(_) => {
                if fs::read_to_string(&target).is_ok_and(|current| current == contents) {
                    debug!(path = %target.display(), "Rendered file unchanged");
                    report.unchanged.push(target);
                    return Ok(());
                }
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(path_error(&target, e)),
        }

        let mut temp = target.clone().into_os_string();
        temp.push(TEMP_SUFFIX);
        let temp = PathBuf::from(temp);

        fs::write(&temp, contents).map_err(|e| path_error(&temp, e))?;
        self.take_ownership(&temp)?;
        if let Err(e) = fs::rename(&temp, &target) {
            let _ = fs::remove_file(&temp);
            return Err(path_error(&target, e));
        }

        debug!(path = %target.display(), "Installed rendered file");
        report.installed.push(target);
        Ok(())
    }

    fn take_ownership(&self, path: &Path) -> Result<()> {
        if let Some((uid, gid)) = self.owner {
            chown(path, Some(uid), Some(gid)).map_err(|e| path_error(path, e))?;
        }
        Ok(())
    }
}

fn path_error(path: &Path, message: impl ToString) -> AstroError {
    AstroError::PathCreationError {
        path: path.to_path_buf(),
        message: message.to_string(),
    }
}
