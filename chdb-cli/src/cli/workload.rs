// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Concurrent insert/query workload
//!
//! Several rules share one connection. Each rule wakes up on its own random
//! interval, reports the table size, inserts a batch of rows and reads back
//! the rows above a random threshold.

use chdb_driver::{open, params, Connection};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const ID_LEN: usize = 26;

/// Workload settings
#[derive(Debug, Clone)]
pub struct WorkloadOptions {
    pub dsn: String,
    pub rules: usize,
    pub batch: usize,
    pub min_interval: Duration,
    pub max_interval: Duration,
    pub rounds: Option<u64>,
}

/// One periodic insert/query loop
pub struct Rule {
    name: String,
    conn: Arc<Connection>,
    interval: Duration,
    batch: usize,
}

impl Rule {
    pub fn new(name: String, conn: Arc<Connection>, interval: Duration, batch: usize) -> Self {
        Self {
            name,
            conn,
            interval,
            batch,
        }
    }

    pub fn run_loop(&self, rounds: Option<u64>) -> chdb_driver::Result<()> {
        self.init_table()?;
        let mut round = 0u64;
        while rounds.map_or(true, |limit| round < limit) {
            thread::sleep(self.interval);
            log::info!("[{}] round {}: table count {}", self.name, round + 1, self.table_count());
            self.execute_work();
            round += 1;
        }
        Ok(())
    }

    fn init_table(&self) -> chdb_driver::Result<()> {
        const QUERY: &str = "
            CREATE TABLE IF NOT EXISTS test_table (
                id FixedString(26),
                randValue Int64
            ) engine = MergeTree()
            order by id
        ";
        self.conn.exec(QUERY, params![])?;
        Ok(())
    }

    /// Row count of the shared table; 0 when the query fails
    pub fn table_count(&self) -> u64 {
        let mut row = self.conn.query_row("select count() from test_table", params![]);
        if let Some(e) = row.err() {
            log::warn!("[{}] {}", self.name, e);
            return 0;
        }
        let mut count = 0u64;
        match row.scan(&mut [&mut count]) {
            Ok(()) => count,
            Err(e) => {
                log::warn!("[{}] {}", self.name, e);
                0
            }
        }
    }

    /// Insert one batch and read back a random slice; returns the cells collected
    pub fn execute_work(&self) -> usize {
        for _ in 0..self.batch {
            let id = new_id();
            if let Err(e) = self.conn.exec("INSERT INTO test_table VALUES (?,?)", params![id, fastrand::i64(..)]) {
                log::warn!("[{}] {}", self.name, e);
                break;
            }
        }

        let threshold = fastrand::i64(..);
        let mut rows = match self
            .conn
            .query("select * from test_table where randValue > ?", params![threshold])
        {
            Ok(rows) => rows,
            Err(e) => {
                log::warn!("[{}] {}", self.name, e);
                return 0;
            }
        };

        let mut collected = 0;
        while rows.next() {
            let mut id = String::new();
            let mut value = 0i64;
            if let Err(e) = rows.scan(&mut [&mut id, &mut value]) {
                log::warn!("[{}] {}", self.name, e);
                continue;
            }
            collected += 2;
        }
        rows.close();
        log::info!("[{}] collected a total of {} cells from the database", self.name, collected);
        collected
    }
}

/// Random id of exactly `ID_LEN` characters
fn new_id() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    id[..ID_LEN].to_string()
}

/// Run `options.rules` rules on one shared connection until they finish
pub fn run_workload(options: WorkloadOptions) -> Result<(), Box<dyn std::error::Error>> {
    if options.min_interval > options.max_interval {
        return Err("--min-interval must not exceed --max-interval".into());
    }
    let conn = Arc::new(open(&options.dsn)?);
    log::info!("Starting {} rules on {:?}", options.rules, conn.config().mode);

    let min = options.min_interval.as_millis() as u64;
    let max = options.max_interval.as_millis() as u64;
    let workers: Vec<_> = (0..options.rules)
        .map(|_| {
            let rule = Rule::new(
                new_id(),
                conn.clone(),
                Duration::from_millis(fastrand::u64(min..=max)),
                options.batch,
            );
            let rounds = options.rounds;
            thread::spawn(move || rule.run_loop(rounds))
        })
        .collect();

    for worker in workers {
        match worker.join() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => log::error!("Rule failed: {}", e),
            Err(_) => log::error!("Rule thread panicked"),
        }
    }
    conn.close()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_round_trip() {
        let conn = Arc::new(open("").unwrap());
        let rule = Rule::new("test".to_string(), conn.clone(), Duration::ZERO, 20);
        rule.run_loop(Some(2)).unwrap();
        assert_eq!(rule.table_count(), 40);
        assert!(rule.execute_work() % 2 == 0);
        assert_eq!(rule.table_count(), 60);
    }

    #[test]
    fn test_ids_have_fixed_width() {
        assert_eq!(new_id().len(), ID_LEN);
        assert_ne!(new_id(), new_id());
    }

    #[test]
    fn test_interval_bounds_are_checked() {
        let options = WorkloadOptions {
            dsn: String::new(),
            rules: 1,
            batch: 1,
            min_interval: Duration::from_secs(5),
            max_interval: Duration::from_secs(1),
            rounds: Some(0),
        };
        assert!(run_workload(options).is_err());
    }
}
