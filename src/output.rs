//! Program and model files
//!
//! `<stem>.<pro|nat>` holds the trimmed program, `<stem>_model.pro` the
//! model (empty when no model entails the initiator).

use crate::clauses::ClauseDatabase;
use crate::program::{render_model, Neck, ProgramCompiler};
use crate::types::{Goal, Model};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Paths written by one save
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedFiles {
    pub program: PathBuf,
    pub model: PathBuf,
}

#[derive(Debug, Clone)]
pub struct OutputSink {
    dir: PathBuf,
    compiler: ProgramCompiler,
}

impl OutputSink {
    pub fn new(dir: impl Into<PathBuf>, neck: Neck) -> Self {
        Self {
            dir: dir.into(),
            compiler: ProgramCompiler::new(neck),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn save(
        &self,
        stem: &str,
        initiator: &Goal,
        clauses: &ClauseDatabase,
        model: Option<&Model>,
    ) -> Result<SavedFiles> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create output dir {:?}", self.dir))?;

        let program = self
            .dir
            .join(format!("{}.{}", stem, self.compiler.neck().suffix()));
        let text = self.compiler.compile(clauses)?;
        fs::write(&program, text)
            .with_context(|| format!("Failed to write program to {:?}", program))?;

        let model_path = self
            .dir
            .join(format!("{}_model.{}", stem, Neck::Prolog.suffix()));
        let empty = Model::default();
        fs::write(&model_path, render_model(initiator, model.unwrap_or(&empty)))
            .with_context(|| format!("Failed to write model to {:?}", model_path))?;

        tracing::info!("Saved {:?} and {:?}", program, model_path);
        Ok(SavedFiles {
            program,
            model: model_path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn g(s: &str) -> Goal {
        Goal::verbatim(s)
    }

    #[test]
    fn test_save_writes_both_files() {
        let dir = tempdir().unwrap();
        let sink = OutputSink::new(dir.path().join("out"), Neck::Prolog);

        let mut db = ClauseDatabase::new();
        db.record(g("top"), vec![g("leaf")]);
        db.record(g("leaf"), Vec::new());
        let model: Model = [g("top"), g("leaf")].into_iter().collect();

        let saved = sink.save("top_p_1", &g("top"), &db, Some(&model)).unwrap();
        assert!(saved.program.ends_with("top_p_1.pro"));
        assert!(saved.model.ends_with("top_p_1_model.pro"));

        let program = fs::read_to_string(&saved.program).unwrap();
        assert_eq!(program, "% CLAUSES:\n'top' :-\n    'leaf'.\n'leaf'.\n");
        let model_text = fs::read_to_string(&saved.model).unwrap();
        assert!(model_text.starts_with("% MODEL: 2 facts\n"));
        assert!(model_text.contains("'top'. % <== initiator"));
    }

    #[test]
    fn test_save_without_model_and_natural_neck() {
        let dir = tempdir().unwrap();
        let sink = OutputSink::new(dir.path(), Neck::Natural);

        let saved = sink
            .save("x", &g("x"), &ClauseDatabase::new(), None)
            .unwrap();
        assert!(saved.program.ends_with("x.nat"));
        assert_eq!(fs::read_to_string(&saved.program).unwrap(), "% CLAUSES:\n");
        assert_eq!(
            fs::read_to_string(&saved.model).unwrap(),
            "% MODEL: 0 facts\n"
        );
    }

    #[test]
    fn test_malformed_clauses_fail_the_save() {
        let dir = tempdir().unwrap();
        let sink = OutputSink::new(dir.path(), Neck::Prolog);
        let mut db = ClauseDatabase::new();
        db.record(g("h"), vec![g("a"), Goal::fail()]);
        assert!(sink.save("bad", &g("h"), &db, None).is_err());
    }
}
