//! Technology Expansion Table: topic keyword → related concrete technologies.
//!
//! Applied to the job-description side only: expansion broadens what counts as
//! required, never what the candidate is credited with.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::analysis::keywords::KeywordSet;
use crate::analysis::normalizer::Normalizer;

const BUILTIN_TECHNOLOGIES: &[(&str, &[&str])] = &[
    (
        "python",
        &[
            "pandas", "numpy", "scikit-learn", "django", "flask", "requests", "beautifulsoup4",
            "matplotlib", "seaborn", "pytest", "unittest",
        ],
    ),
    (
        "deep learning",
        &["pytorch", "tensorflow", "keras", "theano", "caffe", "onnx", "tensorrt", "transformers"],
    ),
    (
        "javascript",
        &[
            "react", "angular", "node.js", "vue.js", "express", "webpack", "babel", "jquery",
            "typescript",
        ],
    ),
    (
        "java",
        &["spring", "hibernate", "maven", "gradle", "junit", "mockito", "servlet", "jsp"],
    ),
    (
        "sql",
        &[
            "mysql",
            "postgresql",
            "sqlite",
            "oracle",
            "sql server",
            "mongodb",
            "cassandra",
            "redis",
        ],
    ),
    ("c++", &["boost", "stl", "qt", "opencv", "cmake"]),
    ("c#", &[".net", "asp.net", "entity framework", "unity", "xamarin"]),
    (
        "mobile development",
        &["android", "ios", "swift", "kotlin", "flutter", "react native", "xamarin"],
    ),
    (
        "cloud computing",
        &["aws", "azure", "google cloud", "docker", "kubernetes", "lambda", "ecs", "gke", "ec2"],
    ),
    (
        "devops",
        &[
            "jenkins", "gitlab ci", "circleci", "ansible", "terraform", "chef", "puppet",
            "prometheus", "grafana", "kubernetes", "docker",
        ],
    ),
    ("data visualization", &["tableau", "power bi", "d3.js", "plotly"]),
    ("testing", &["selenium", "junit", "pytest", "cypress", "mocha", "jest"]),
    ("api", &["rest", "graphql", "soap"]),
    ("machine learning", &["scikit-learn", "xgboost", "lightgbm", "catboost"]),
    ("frontend", &["html", "css", "javascript", "react", "angular", "vue.js"]),
    ("backend", &["node.js", "java", "python", "php", "ruby", "go", "c#"]),
    (
        "databases",
        &["mysql", "postgresql", "mongodb", "cassandra", "redis", "oracle", "sql server"],
    ),
    ("version control", &["git", "github", "gitlab", "bitbucket"]),
    ("operating system", &["linux", "windows", "macos"]),
];

/// Read-only topic → technologies table. Built once at startup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TechnologyMapping {
    topics: BTreeMap<String, Vec<String>>,
}

impl TechnologyMapping {
    pub fn builtin() -> Self {
        let topics = BUILTIN_TECHNOLOGIES
            .iter()
            .map(|(topic, techs)| {
                (
                    topic.to_string(),
                    techs.iter().map(|t| t.to_string()).collect(),
                )
            })
            .collect();
        Self { topics }
    }

    pub fn from_topics(topics: BTreeMap<String, Vec<String>>) -> Self {
        Self { topics }
    }

    /// Loads a JSON object of `{ "topic": ["tech", ...] }`.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read technology mapping '{}'", path.display()))?;
        let topics: BTreeMap<String, Vec<String>> = serde_json::from_str(&raw)
            .with_context(|| {
                format!(
                    "Technology mapping '{}' is not a JSON object of string arrays",
                    path.display()
                )
            })?;
        Ok(Self { topics })
    }

    /// Related technologies for a topic. Exact string match only.
    pub fn related(&self, topic: &str) -> &[String] {
        self.topics.get(topic).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }

    /// Rewrites topics and technologies into `normalizer`'s token space, so they
    /// compare equal to normalized job and resume tokens. Entries that normalize
    /// to nothing are dropped; topics that collide are merged.
    pub fn normalized_with(&self, normalizer: &Normalizer) -> Self {
        let mut topics: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (topic, techs) in &self.topics {
            let key = normalizer.normalize(topic);
            if key.is_empty() {
                continue;
            }
            let entry = topics.entry(key.as_str().to_string()).or_default();
            for tech in techs {
                let term = normalizer.normalize(tech);
                if !term.is_empty() && !entry.iter().any(|t| t == term.as_str()) {
                    entry.push(term.as_str().to_string());
                }
            }
        }
        Self::from_topics(topics)
    }

    /// Unions every matching topic's technologies into the keyword set.
    /// Purely additive: the result is always a superset of `keywords`.
    pub fn expand(&self, keywords: &KeywordSet) -> KeywordSet {
        let mut expanded = keywords.clone();
        for keyword in keywords.iter() {
            expanded.extend(self.related(keyword).iter().cloned());
        }
        expanded
    }
}
