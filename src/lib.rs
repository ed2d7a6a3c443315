//! Recordkeeper – record mapping with optimistic conflict detection.
//!
//! A consumer (typically a data-entry form) asks a [`mapper::RecordMapper`]
//! for the rows it wants to edit, changes them, and commits. Nothing is locked
//! in between. Instead the mapper remembers the rows as they were when
//! editing started and, right before writing, fetches them again to see
//! whether someone else got there first:
//! * a row with a newer modification time, or one that was not there before,
//!   is a *change* by someone else;
//! * a row that is gone is a *deletion* by someone else, which only matters
//!   while the caller still holds that row.
//!
//! Either way the commit fails with [`error::RecordKeeperError::Conflict`] and
//! the caller decides: edit again, or set the conflict as ignored and
//! overwrite.
//!
//! ## Modules
//! * [`datatype`] – The [`datatype::Value`] exchanged with SQL, and how it is
//!   normalized on the way in and out.
//! * [`record`] – [`record::Record`], one row keyed by column name.
//! * [`schema`] – [`schema::Table`] and [`schema::Column`] descriptors.
//! * [`predicate`] – [`predicate::WhereSet`], a composable and serializable
//!   WHERE clause with aligned bind parameters.
//! * [`sql`] – Statement text built from tables, records and where sets.
//! * [`persist`] – [`persist::Persistor`], statements over one SQLite connection.
//! * [`conflict`] – Snapshot against re-fetch classification.
//! * [`mapper`] – The edit/commit lifecycle.
//! * [`settings`] – Configuration via the `config` crate.
//!
//! ## Quick Start
//! ```
//! use recordkeeper::persist::{Persistor, PersistenceMode};
//! use recordkeeper::schema::{Column, Table};
//! use recordkeeper::mapper::{KeyedMapping, RecordMapper};
//! use recordkeeper::predicate::{Comparison, WhereSet};
//!
//! let persistor = Persistor::open(PersistenceMode::InMemory).unwrap();
//! persistor.execute_batch("create table person (id integer primary key, name text);").unwrap();
//! persistor.execute("insert into person (id, name) values (1, 'Alice')", &[]).unwrap();
//!
//! let table = Table::new("person")
//!     .with_column(Column::new("id", "Id"))
//!     .with_column(Column::new("name", "Name"));
//! let mut where_set = WhereSet::new();
//! where_set.add("id", Comparison::Equal, 1).unwrap();
//! let mut mapper = RecordMapper::single(&persistor, KeyedMapping::new(table, &["id"]), where_set);
//! let records = mapper.edit().unwrap();
//! records[0].set_field("name", "Alicia");
//! mapper.commit().unwrap();
//! let name = persistor.fetch_scalar("select name from person where id = 1", &[]).unwrap();
//! assert_eq!(name.to_string(), "Alicia");
//! ```

pub mod conflict;
pub mod datatype;
pub mod error;
pub mod mapper;
pub mod persist;
pub mod predicate;
pub mod record;
pub mod schema;
pub mod settings;
pub mod sql;

pub use error::{RecordKeeperError, Result};
