//! Multi-stage aggregation pipelines.
//!
//! A [`Pipeline`] is an ordered list of [`Stage`]s evaluated in declaration
//! order. [`eval::run_pipeline`] is the in-process evaluator shared by the
//! store adapters; [`report`] holds the fixed pipelines behind the
//! statistics endpoints.

pub mod eval;
pub mod report;

use serde_json::Value;

use crate::geo::GeoPoint;
use crate::query::{FilterSpec, Projection, SortKey};

pub use eval::run_pipeline;
pub use report::{run_report, Report};

/// Value expression evaluated per document.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `$field` reference (dotted paths allowed).
    Field(String),
    Literal(Value),
    /// Upper-cases a string; `null` becomes `""`.
    ToUpper(Box<Expr>),
    /// Month (1-12) of an instant.
    Month(Box<Expr>),
}

impl Expr {
    pub fn field(path: impl Into<String>) -> Self {
        Expr::Field(path.into())
    }

    pub fn literal(value: impl Into<Value>) -> Self {
        Expr::Literal(value.into())
    }

    pub fn to_upper(inner: Expr) -> Self {
        Expr::ToUpper(Box::new(inner))
    }

    pub fn month(inner: Expr) -> Self {
        Expr::Month(Box::new(inner))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Accumulator {
    Sum(Expr),
    Avg(Expr),
    Min(Expr),
    Max(Expr),
    Push(Expr),
}

impl Accumulator {
    /// `$sum: 1`.
    pub fn count() -> Self {
        Accumulator::Sum(Expr::literal(1))
    }
}

/// Group documents by `key`, computing one output field per accumulator.
/// The group key lands in `_id`.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub key: Expr,
    pub fields: Vec<(String, Accumulator)>,
}

impl Group {
    pub fn by(key: Expr) -> Self {
        Self {
            key,
            fields: Vec::new(),
        }
    }

    pub fn with(mut self, name: impl Into<String>, accumulator: Accumulator) -> Self {
        self.fields.push((name.into(), accumulator));
        self
    }
}

/// Distance-ordered stage; only valid as the first stage of a pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoNear {
    pub near: GeoPoint,
    /// Field holding the GeoJSON point.
    pub key: String,
    /// Output field receiving the distance.
    pub distance_field: String,
    /// Factor applied to metres.
    pub distance_multiplier: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    Match(FilterSpec),
    Group(Group),
    Sort(Vec<SortKey>),
    Project(Projection),
    Unwind(String),
    AddFields(Vec<(String, Expr)>),
    GeoNear(GeoNear),
    Limit(usize),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn matching(self, filter: FilterSpec) -> Self {
        self.stage(Stage::Match(filter))
    }

    pub fn group(self, group: Group) -> Self {
        self.stage(Stage::Group(group))
    }

    pub fn sort(self, keys: Vec<SortKey>) -> Self {
        self.stage(Stage::Sort(keys))
    }

    pub fn project(self, projection: Projection) -> Self {
        self.stage(Stage::Project(projection))
    }

    pub fn unwind(self, field: impl Into<String>) -> Self {
        self.stage(Stage::Unwind(field.into()))
    }

    pub fn add_field(self, name: impl Into<String>, expr: Expr) -> Self {
        self.stage(Stage::AddFields(vec![(name.into(), expr)]))
    }

    pub fn geo_near(self, geo_near: GeoNear) -> Self {
        self.stage(Stage::GeoNear(geo_near))
    }

    pub fn limit(self, n: usize) -> Self {
        self.stage(Stage::Limit(n))
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }
}
