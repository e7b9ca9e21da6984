//! Demo database setup.
//!
//! Creates a SQLite database from the SQL Server flavoured `schema.sql` and
//! seeds it with a small inventory data set. Failed statements are logged
//! and skipped so one bad line does not abort the whole setup.

use std::path::{Path, PathBuf};

use regex::Regex;

use crate::config::Config;
use crate::db::{sqlite_file_path, DatabaseBackend, DatabaseClient, SqliteClient};
use crate::error::{ChatError, Result};

/// Seed rows inserted after the schema is created.
pub const DEMO_DATA: &[&str] = &[
    "INSERT INTO Sites (SiteId, SiteCode, SiteName, City, Country) VALUES (1, 'NYC01', 'New York HQ', 'New York', 'USA')",
    "INSERT INTO Sites (SiteId, SiteCode, SiteName, City, Country) VALUES (2, 'LDN01', 'London Office', 'London', 'UK')",
    "INSERT INTO Sites (SiteId, SiteCode, SiteName, City, Country) VALUES (3, 'TYO01', 'Tokyo Branch', 'Tokyo', 'Japan')",
    "INSERT INTO Locations (LocationId, SiteId, LocationCode, LocationName) VALUES (1, 1, 'FL1', 'Floor 1')",
    "INSERT INTO Locations (LocationId, SiteId, LocationCode, LocationName) VALUES (2, 2, 'FL2', 'Floor 2')",
    "INSERT INTO Customers (CustomerId, CustomerCode, CustomerName) VALUES (1, 'CUST1', 'Acme Corp')",
    "INSERT INTO Customers (CustomerId, CustomerCode, CustomerName) VALUES (2, 'CUST2', 'Globex Inc')",
    "INSERT INTO Vendors (VendorId, VendorCode, VendorName) VALUES (1, 'V001', 'Tech Supplies Inc')",
    "INSERT INTO Vendors (VendorId, VendorCode, VendorName) VALUES (2, 'V002', 'Office Furniture Co')",
    "INSERT INTO Vendors (VendorId, VendorCode, VendorName) VALUES (3, 'V003', 'Enterprise Software Ltd')",
    "INSERT INTO Items (ItemId, ItemCode, ItemName, Category) VALUES (1, 'ITM-L1', 'Laptop', 'Electronics')",
    "INSERT INTO Items (ItemId, ItemCode, ItemName, Category) VALUES (2, 'ITM-D1', 'Desk', 'Furniture')",
    "INSERT INTO Items (ItemId, ItemCode, ItemName, Category) VALUES (3, 'ITM-M1', 'Monitor', 'Electronics')",
    "INSERT INTO Assets (AssetTag, AssetName, SiteId, Category, Status, Cost, PurchaseDate, VendorId) VALUES ('AST-001', 'Dell XPS 15', 1, 'Electronics', 'Active', 1500.00, '2023-01-15', 1)",
    "INSERT INTO Assets (AssetTag, AssetName, SiteId, Category, Status, Cost, PurchaseDate, VendorId) VALUES ('AST-002', 'MacBook Pro', 2, 'Electronics', 'Active', 2500.00, '2024-02-10', 1)",
    "INSERT INTO Assets (AssetTag, AssetName, SiteId, Category, Status, Cost, PurchaseDate, VendorId) VALUES ('AST-003', 'Herman Miller Chair', 1, 'Furniture', 'Active', 800.00, '2024-01-20', 2)",
    "INSERT INTO Assets (AssetTag, AssetName, SiteId, Category, Status, Cost, PurchaseDate, VendorId) VALUES ('AST-004', 'Broken Monitor', 1, 'Electronics', 'Disposed', 300.00, '2022-05-11', 1)",
    "INSERT INTO Assets (AssetTag, AssetName, SiteId, Category, Status, Cost, PurchaseDate, VendorId) VALUES ('AST-005', 'Standing Desk', 3, 'Furniture', 'Active', 600.00, '2024-03-05', 2)",
    "INSERT INTO Bills (BillId, VendorId, BillNumber, BillDate, TotalAmount) VALUES (1, 1, 'B-1001', '2024-01-15', 5000.00)",
    "INSERT INTO Bills (BillId, VendorId, BillNumber, BillDate, TotalAmount) VALUES (2, 3, 'B-1002', '2024-02-20', 12000.00)",
    "INSERT INTO Bills (BillId, VendorId, BillNumber, BillDate, TotalAmount) VALUES (3, 1, 'B-1003', '2024-04-10', 3000.00)",
    "INSERT INTO PurchaseOrders (POId, PONumber, VendorId, PODate, Status) VALUES (1, 'PO-2024-01', 1, '2024-05-01', 'Open')",
    "INSERT INTO PurchaseOrders (POId, PONumber, VendorId, PODate, Status) VALUES (2, 'PO-2024-02', 2, '2024-05-02', 'Closed')",
    "INSERT INTO PurchaseOrders (POId, PONumber, VendorId, PODate, Status) VALUES (3, 'PO-2024-03', 3, '2024-05-03', 'Open')",
    "INSERT INTO SalesOrders (SOId, SONumber, CustomerId, SODate, Status) VALUES (1, 'SO-101', 1, date('now', '-1 month'), 'Closed')",
    "INSERT INTO SalesOrders (SOId, SONumber, CustomerId, SODate, Status) VALUES (2, 'SO-102', 2, date('now', '-1 month'), 'Open')",
    "INSERT INTO SalesOrders (SOId, SONumber, CustomerId, SODate, Status) VALUES (3, 'SO-103', 1, date('now', '-2 month'), 'Closed')",
];

/// Rewrites SQL Server column types and defaults into SQLite equivalents.
pub struct DdlConverter {
    rules: Vec<(Regex, &'static str)>,
}

impl DdlConverter {
    pub fn new() -> Result<Self> {
        let patterns: [(&str, &'static str); 6] = [
            (r"(?i)\bN?VARCHAR\s*\(\s*(\d+|MAX)\s*\)", "TEXT"),
            (
                r"(?i)\bINT\s+IDENTITY(\s*\(\s*\d+\s*,\s*\d+\s*\))?\s+PRIMARY\s+KEY\b",
                "INTEGER PRIMARY KEY AUTOINCREMENT",
            ),
            (r"(?i)\bDATETIME2\b", "TEXT"),
            (r"(?i)\bBIT\b", "INTEGER"),
            (r"(?i)\bSYSUTCDATETIME\s*\(\s*\)", "CURRENT_TIMESTAMP"),
            (r"(?i)\bDECIMAL\s*\(\s*\d+\s*,\s*\d+\s*\)", "REAL"),
        ];

        let rules = patterns
            .into_iter()
            .map(|(pattern, replacement)| {
                Regex::new(pattern)
                    .map(|re| (re, replacement))
                    .map_err(|e| ChatError::internal(format!("Invalid DDL rule {pattern}: {e}")))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { rules })
    }

    pub fn convert(&self, ddl: &str) -> String {
        self.rules
            .iter()
            .fold(ddl.to_string(), |acc, (re, replacement)| {
                re.replace_all(&acc, *replacement).into_owned()
            })
    }
}

/// Splits a script on `;` into trimmed, non-empty statements.
pub fn split_statements(script: &str) -> Vec<String> {
    script
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// What `init_db` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitOutcome {
    /// The database file was already there; nothing was touched.
    Skipped { path: PathBuf },
    /// The database was created. `failed` counts statements that errored.
    Created {
        path: PathBuf,
        executed: usize,
        failed: usize,
    },
}

/// Creates and seeds the SQLite database named by the configuration.
pub async fn init_db(config: &Config) -> Result<InitOutcome> {
    if DatabaseBackend::from_url(&config.database.url)? != DatabaseBackend::Sqlite {
        return Err(ChatError::config(
            "init-db only supports SQLite database URLs",
        ));
    }
    let path = sqlite_file_path(&config.database.url)?.ok_or_else(|| {
        ChatError::config("init-db needs a file-backed SQLite URL, not an in-memory one")
    })?;

    let ddl = config.load_schema_ddl()?;
    init_db_at(&path, &ddl).await
}

/// Creates and seeds a SQLite database at `path` from SQL Server DDL.
pub async fn init_db_at(path: &Path, ddl: &str) -> Result<InitOutcome> {
    if path.exists() {
        tracing::info!(path = %path.display(), "Database already exists. Skipping initialization.");
        return Ok(InitOutcome::Skipped {
            path: path.to_path_buf(),
        });
    }

    tracing::info!(path = %path.display(), "Initializing database");

    let converter = DdlConverter::new()?;
    let client = SqliteClient::open_file(path).await?;

    let schema: Vec<String> = split_statements(ddl)
        .iter()
        .map(|stmt| converter.convert(stmt))
        .collect();
    let seed = DEMO_DATA.iter().map(|stmt| stmt.to_string());

    let mut executed = 0;
    let mut failed = 0;
    for stmt in schema.into_iter().chain(seed) {
        match client.execute_query(&stmt).await {
            Ok(_) => executed += 1,
            Err(e) => {
                failed += 1;
                tracing::warn!(statement = %stmt, error = %e, "Setup statement failed");
            }
        }
    }

    client.close().await?;

    tracing::info!(executed, failed, "Database initialized");
    Ok(InitOutcome::Created {
        path: path.to_path_buf(),
        executed,
        failed,
    })
}
