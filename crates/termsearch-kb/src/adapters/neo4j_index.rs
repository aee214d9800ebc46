use async_trait::async_trait;
use neo4rs::{BoltType, ConfigBuilder, Graph, Query};
use std::collections::HashMap;
use tracing::{debug, info, warn};

use super::Neo4jIndexConfig;
use crate::data::{BackendUnavailable, TermId, TermRecord};
use crate::traits::{IndexHit, IndexedSearchBackend, ScoreMetric};

/// Term vectors stored as Neo4j nodes and ranked by a native cosine vector index.
///
/// Neo4j reports cosine scores as `(1 + cos) / 2`, so this backend declares
/// [`ScoreMetric::NormalizedCosine`].
pub struct Neo4jVectorIndex {
    graph: Graph,
    config: Neo4jIndexConfig,
}

impl Neo4jVectorIndex {
    pub async fn connect(config: Neo4jIndexConfig) -> Result<Self, BackendUnavailable> {
        validate_identifier(&config.index_name)?;
        validate_identifier(&config.label)?;

        let mut builder = ConfigBuilder::default()
            .uri(&config.uri)
            .user(&config.username)
            .password(&config.password)
            .max_connections(config.pool_size.max(1));
        if let Some(db) = &config.database {
            builder = builder.db(db.as_str());
        }
        let neo4j_config = builder
            .build()
            .map_err(|e| BackendUnavailable::Unsupported(format!("invalid Neo4j config: {}", e)))?;

        let graph = Graph::connect(neo4j_config)
            .await
            .map_err(|e| BackendUnavailable::Transient(format!("failed to connect to {}: {}", config.uri, e)))?;

        info!(uri = %config.uri, index = %config.index_name, label = %config.label, "Connected to Neo4j vector index");
        Ok(Self { graph, config })
    }

    /// Makes the cosine vector index match `dimension`, dropping an index
    /// built for vectors of another length first.
    pub async fn ensure_index(&self, dimension: usize) -> Result<(), BackendUnavailable> {
        let existing = self.index_dimension().await?;
        if let Some(previous) = existing.filter(|&d| d != dimension) {
            info!(index = %self.config.index_name, previous, dimension, "Recreating vector index for new dimension");
        }
        for statement in index_statements(&self.config.index_name, &self.config.label, existing, dimension) {
            self.run(Query::new(statement)).await?;
        }
        debug!(index = %self.config.index_name, dimension, "Vector index ensured");
        Ok(())
    }

    /// Vector length of the configured index, if it exists.
    async fn index_dimension(&self) -> Result<Option<usize>, BackendUnavailable> {
        let q = Query::new(
            "SHOW INDEXES YIELD name, type, options \
             WHERE name = $index_name AND type = 'VECTOR' \
             RETURN options.indexConfig.`vector.dimensions` AS dimension"
                .to_string(),
        )
        .param("index_name", self.config.index_name.as_str());

        let mut stream = self.graph.execute(q).await.map_err(classify)?;
        match stream.next().await.map_err(classify)? {
            Some(row) => {
                let dimension: i64 = row
                    .get("dimension")
                    .map_err(|e| BackendUnavailable::Malformed(format!("missing index dimension: {}", e)))?;
                Ok(usize::try_from(dimension).ok())
            }
            None => Ok(None),
        }
    }

    async fn run(&self, query: Query) -> Result<(), BackendUnavailable> {
        let mut stream = self.graph.execute(query).await.map_err(classify)?;
        while stream.next().await.map_err(classify)?.is_some() {}
        Ok(())
    }
}

#[async_trait]
impl IndexedSearchBackend for Neo4jVectorIndex {
    fn name(&self) -> &str {
        "neo4j"
    }

    fn score_metric(&self) -> ScoreMetric {
        ScoreMetric::NormalizedCosine
    }

    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<IndexHit>, BackendUnavailable> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let embedding: Vec<f64> = query.iter().map(|&v| v as f64).collect();
        let candidates = self.config.num_candidates.max(k);
        let q = Query::new(
            "CALL db.index.vector.queryNodes($index_name, $num_candidates, $embedding) \
             YIELD node, score \
             RETURN node.id AS id, score \
             ORDER BY score DESC \
             LIMIT $k"
                .to_string(),
        )
        .param("index_name", self.config.index_name.as_str())
        .param("num_candidates", candidates as i64)
        .param("embedding", embedding)
        .param("k", k as i64);

        let mut stream = self.graph.execute(q).await.map_err(classify)?;
        let mut hits = Vec::new();
        while let Some(row) = stream.next().await.map_err(classify)? {
            let id: String = row
                .get("id")
                .map_err(|e| BackendUnavailable::Malformed(format!("missing id column: {}", e)))?;
            let score: f64 = row
                .get("score")
                .map_err(|e| BackendUnavailable::Malformed(format!("missing score column: {}", e)))?;
            let id: TermId = id
                .parse()
                .map_err(|e| BackendUnavailable::Malformed(format!("invalid term id '{}': {}", id, e)))?;
            hits.push(IndexHit { id, score: score as f32 });
        }

        debug!(index = %self.config.index_name, k, hits = hits.len(), "Neo4j vector search finished");
        Ok(hits)
    }

    /// Replaces every node in one transaction, so searches never see a
    /// partially written corpus, then aligns the vector index.
    async fn rebuild(&self, records: &[TermRecord]) -> Result<(), BackendUnavailable> {
        let (rows, dimension) = node_rows(records);
        let written = rows.len();

        let mut queries = vec![Query::new(format!("MATCH (n:{}) DETACH DELETE n", self.config.label))];
        let create = format!(
            "UNWIND $rows AS row \
             CREATE (n:{} {{id: row.id, term: row.term, english: row.english, embedding: row.embedding}})",
            self.config.label
        );
        for chunk in rows.chunks(WRITE_CHUNK) {
            queries.push(Query::new(create.clone()).param("rows", chunk.to_vec()));
        }

        let mut txn = self.graph.start_txn().await.map_err(classify)?;
        if let Err(e) = txn.run_queries(queries).await {
            if let Err(rollback) = txn.rollback().await {
                warn!(error = %rollback, "Neo4j rollback failed");
            }
            return Err(classify(e));
        }
        txn.commit().await.map_err(classify)?;

        match dimension {
            Some(d) => self.ensure_index(d).await?,
            None => warn!(label = %self.config.label, "No embedded records; vector index left unchanged"),
        }

        info!(label = %self.config.label, nodes = written, "Neo4j vector index rebuilt");
        Ok(())
    }
}

/// Rows sent per `UNWIND` statement
const WRITE_CHUNK: usize = 500;

/// One parameter map per embedded record, plus the shared vector length.
fn node_rows(records: &[TermRecord]) -> (Vec<BoltType>, Option<usize>) {
    let mut dimension = None;
    let rows: Vec<BoltType> = records
        .iter()
        .filter_map(|record| {
            let vector = record.embedding.as_ref()?;
            dimension.get_or_insert(vector.len());
            let embedding: Vec<f64> = vector.iter().map(|&v| v as f64).collect();
            let mut row: HashMap<&str, BoltType> = HashMap::new();
            row.insert("id", record.id.to_string().into());
            row.insert("term", record.term.as_str().into());
            row.insert("english", record.english.as_str().into());
            row.insert("embedding", embedding.into());
            Some(BoltType::from(row))
        })
        .collect();
    (rows, dimension)
}

/// Schema statements that leave `index` as a cosine index over `dimension`-long vectors.
fn index_statements(index: &str, label: &str, existing: Option<usize>, dimension: usize) -> Vec<String> {
    let create = format!(
        "CREATE VECTOR INDEX {index} IF NOT EXISTS FOR (n:{label}) ON (n.embedding) \
         OPTIONS {{indexConfig: {{`vector.dimensions`: {dimension}, `vector.similarity_function`: 'cosine'}}}}",
        index = index,
        label = label,
        dimension = dimension,
    );
    match existing {
        Some(d) if d == dimension => Vec::new(),
        Some(_) => vec![format!("DROP INDEX {} IF EXISTS", index), create],
        None => vec![create],
    }
}

/// Maps a driver error onto the backend failure taxonomy.
fn classify(error: neo4rs::Error) -> BackendUnavailable {
    classify_message(error.to_string())
}

fn classify_message(message: String) -> BackendUnavailable {
    let lowered = message.to_lowercase();
    if lowered.contains("no such vector schema index")
        || (lowered.contains("index") && lowered.contains("does not exist")) {
        BackendUnavailable::IndexMissing(message)
    } else if lowered.contains("procedurenotfound") || lowered.contains("no procedure") || lowered.contains("unknown function") {
        BackendUnavailable::Unsupported(message)
    } else {
        BackendUnavailable::Transient(message)
    }
}

/// Labels and index names are spliced into Cypher text, so only plain identifiers are allowed.
fn validate_identifier(name: &str) -> Result<(), BackendUnavailable> {
    let mut chars = name.chars();
    let valid = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(BackendUnavailable::Unsupported(format!("invalid Neo4j identifier '{}'", name)))
    }
}
