#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use survivor_pool::parser::{self, RowRecord, SectionMissing, TableGrammar};
use survivor_pool::pipeline::Pipeline;
use survivor_pool::roster::AliasTable;
use survivor_pool::snapshot::SnapshotStore;
use survivor_pool::source::SourceAdapter;
use survivor_pool::wiki::{FetchFailure, FetchFailureKind};
use tempfile::TempDir;

/// What a scripted source returns for one title.
#[derive(Debug, Clone)]
pub enum Reply {
    Page(String),
    Fail(FetchFailureKind),
}

/// In-memory source answering from a fixed script.
///
/// Titles without a scripted reply fail as not found. Every fetch is recorded
/// in the shared call log so tests can check order across sources.
pub struct ScriptedSource {
    name: String,
    titles: Vec<String>,
    replies: HashMap<String, Reply>,
    grammar: TableGrammar,
    calls: Arc<Mutex<Vec<String>>>,
}

impl ScriptedSource {
    pub fn new(name: &str, calls: &Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            name: name.to_owned(),
            titles: Vec::new(),
            replies: HashMap::new(),
            grammar: TableGrammar::default(),
            calls: Arc::clone(calls),
        }
    }

    pub fn page(mut self, title: &str, markup: impl Into<String>) -> Self {
        self.titles.push(title.to_owned());
        self.replies
            .insert(title.to_owned(), Reply::Page(markup.into()));
        self
    }

    pub fn failing(mut self, title: &str, kind: FetchFailureKind) -> Self {
        self.titles.push(title.to_owned());
        self.replies.insert(title.to_owned(), Reply::Fail(kind));
        self
    }

    pub fn boxed(self) -> Box<dyn SourceAdapter> {
        Box::new(self)
    }
}

#[async_trait]
impl SourceAdapter for ScriptedSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn titles(&self) -> &[String] {
        &self.titles
    }

    async fn fetch(&self, title: &str) -> Result<String, FetchFailure> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("{}:{title}", self.name));

        let title_owned = title.to_owned();
        match self.replies.get(title) {
            Some(Reply::Page(markup)) => Ok(markup.clone()),
            Some(Reply::Fail(FetchFailureKind::Transient)) => Err(FetchFailure::Transient {
                title: title_owned,
                source: anyhow::anyhow!("connection reset"),
            }),
            Some(Reply::Fail(FetchFailureKind::Malformed)) => Err(FetchFailure::Malformed {
                title: title_owned,
                reason: "not JSON".to_owned(),
            }),
            Some(Reply::Fail(FetchFailureKind::NotFound)) | None => Err(FetchFailure::NotFound {
                title: title_owned,
                reason: "missingtitle".to_owned(),
            }),
        }
    }

    fn parse(
        &self,
        markup: &str,
        aliases: &AliasTable,
    ) -> Result<Vec<RowRecord>, SectionMissing> {
        parser::parse(markup, &self.grammar, aliases)
    }
}

/// One castaway table row.
pub fn row(name: &str, finish: &str) -> String {
    if finish.is_empty() {
        format!("|-\n| '''[[{name}]]'''\n| Tribe\n|\n")
    } else {
        format!("|-\n| '''[[{name}]]'''\n| Tribe\n| {{{{nowrap|{finish}}}}}\n")
    }
}

/// A page with a `Castaways` section holding `rows`.
pub fn page(rows: &[(&str, &str)]) -> String {
    let mut markup = String::from(
        "'''Test Season''' is a season.\n\n== Castaways ==\n{| class=\"wikitable\"\n! Castaway !! Tribe !! Finish\n",
    );
    for (name, finish) in rows {
        markup.push_str(&row(name, finish));
    }
    markup.push_str("|}\n\n== Season summary ==\nNothing here.\n");
    markup
}

/// Aliases for the names used by [`page`] based tests.
pub fn aliases() -> AliasTable {
    AliasTable::new([
        ("Jane Doe", "JaneDoe"),
        ("John Roe", "JohnRoe"),
        ("Ann Poe", "AnnPoe"),
        ("Bob Loe", "BobLoe"),
        ("Cat Moe", "CatMoe"),
        ("Dan Koe", "DanKoe"),
    ])
}

/// A pipeline over `sources` persisting into a fresh temporary directory.
pub fn pipeline(sources: Vec<Box<dyn SourceAdapter>>) -> (Pipeline, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let store = SnapshotStore::new(dir.path().join("survivor_data.json"));
    (Pipeline::new(sources, aliases(), store), dir)
}

pub fn call_log() -> Arc<Mutex<Vec<String>>> {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn calls(log: &Arc<Mutex<Vec<String>>>) -> Vec<String> {
    log.lock().unwrap().clone()
}
