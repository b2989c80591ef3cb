use std::path::PathBuf;

use anyhow::Result;

use crate::Error;

/// The global engine configuration, lowered: one `Option` field per
/// recognized option key. `None` fields are omitted from what the engine
/// sees, so its own defaults apply; no placeholder values are ever emitted.
/// Field names follow the engine's wire keys. Option values are not
/// range-checked here; the engine reports those at load time.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GlobalConfig {
    /// tasks run when none are named on the command line
    pub default_tasks: Option<Vec<String>>,
    /// execute only the specified tasks, ignoring their task_dep
    pub single: Option<bool>,
    /// keep executing independent tasks after a failure
    pub continue_: Option<bool>,
    /// run tasks even when up to date
    pub always: Option<bool>,
    /// clean: forget all run state
    pub cleanforget: Option<bool>,
    /// clean: also clean task dependencies
    pub cleandep: Option<bool>,
    /// print what would run without running it
    pub dryrun: Option<bool>,
    /// run-state database location (`db_file` is an accepted alias)
    pub dep_file: Option<PathBuf>,
    /// run-state database format
    pub backend: Option<String>,
    pub verbosity: Option<u8>,
    /// verbosity of the end-of-run failure report
    pub failure_verbosity: Option<u8>,
    /// route task output to this file instead of the console
    pub outfile: Option<PathBuf>,
    /// reporter selector
    pub reporter: Option<String>,
    /// working directory for the run
    pub dir: Option<PathBuf>,
    /// number of parallel workers
    pub num_process: Option<usize>,
    /// parallelism kind (process or thread)
    pub par_type: Option<String>,
    /// file up-to-date checker selector (md5 or timestamp)
    pub check_file_uptodate: Option<String>,
    /// drop into the debugger on failure
    pub pdb: Option<bool>,
    /// codec used to encode run state
    pub codec_cls: Option<String>,
    /// minimum engine version this configuration needs
    pub minversion: Option<String>,
    /// treat delayed-task patterns as regexes automatically
    pub auto_delayed_regex: Option<bool>,
    /// action string interpolation style (old, new or both)
    pub action_string_formatting: Option<String>,
}

/// Assembles the [`GlobalConfig`] handed to the engine at load time. Only
/// options the caller explicitly sets are included.
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    config: GlobalConfig,
    /// `db_file` alias value, reconciled with `dep_file` at build time
    db_file: Option<PathBuf>,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn default_tasks(mut self, tasks: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.config.default_tasks = Some(tasks.into_iter().map(Into::into).collect());
        self
    }

    pub fn single(mut self, single: bool) -> Self {
        self.config.single = Some(single);
        self
    }

    pub fn continue_(mut self, continue_: bool) -> Self {
        self.config.continue_ = Some(continue_);
        self
    }

    pub fn always(mut self, always: bool) -> Self {
        self.config.always = Some(always);
        self
    }

    pub fn cleanforget(mut self, cleanforget: bool) -> Self {
        self.config.cleanforget = Some(cleanforget);
        self
    }

    pub fn cleandep(mut self, cleandep: bool) -> Self {
        self.config.cleandep = Some(cleandep);
        self
    }

    pub fn dryrun(mut self, dryrun: bool) -> Self {
        self.config.dryrun = Some(dryrun);
        self
    }

    /// Alias for [`ConfigBuilder::dep_file`]; both name the one underlying
    /// engine key.
    pub fn db_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.db_file = Some(path.into());
        self
    }

    pub fn dep_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.dep_file = Some(path.into());
        self
    }

    pub fn backend(mut self, backend: impl Into<String>) -> Self {
        self.config.backend = Some(backend.into());
        self
    }

    pub fn verbosity(mut self, verbosity: u8) -> Self {
        self.config.verbosity = Some(verbosity);
        self
    }

    pub fn failure_verbosity(mut self, verbosity: u8) -> Self {
        self.config.failure_verbosity = Some(verbosity);
        self
    }

    pub fn outfile(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.outfile = Some(path.into());
        self
    }

    pub fn reporter(mut self, reporter: impl Into<String>) -> Self {
        self.config.reporter = Some(reporter.into());
        self
    }

    pub fn dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.dir = Some(path.into());
        self
    }

    pub fn num_process(mut self, n: usize) -> Self {
        self.config.num_process = Some(n);
        self
    }

    /// Parallelism kind; lowers to the engine's `par_type` key.
    pub fn parallel_type(mut self, kind: impl Into<String>) -> Self {
        self.config.par_type = Some(kind.into());
        self
    }

    pub fn check_file_uptodate(mut self, checker: impl Into<String>) -> Self {
        self.config.check_file_uptodate = Some(checker.into());
        self
    }

    pub fn pdb(mut self, pdb: bool) -> Self {
        self.config.pdb = Some(pdb);
        self
    }

    pub fn codec_cls(mut self, codec: impl Into<String>) -> Self {
        self.config.codec_cls = Some(codec.into());
        self
    }

    pub fn minversion(mut self, version: impl Into<String>) -> Self {
        self.config.minversion = Some(version.into());
        self
    }

    pub fn auto_delayed_regex(mut self, auto: bool) -> Self {
        self.config.auto_delayed_regex = Some(auto);
        self
    }

    pub fn action_string_formatting(mut self, style: impl Into<String>) -> Self {
        self.config.action_string_formatting = Some(style.into());
        self
    }

    /// Finish the configuration. Fails with [`Error::ConflictingAlias`]
    /// when `db_file` and `dep_file` were both given different values.
    pub fn build(self) -> Result<GlobalConfig> {
        let mut config = self.config;
        if let Some(db_file) = self.db_file {
            match &config.dep_file {
                Some(dep_file) if *dep_file != db_file => {
                    return Err(Error::ConflictingAlias(db_file, dep_file.clone()).into());
                }
                _ => config.dep_file = Some(db_file),
            }
        }
        log::debug!("built engine config: {config:?}");
        Ok(config)
    }
}
