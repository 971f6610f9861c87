//! SQLite-backed animal repository.

use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use sqlx::{Executor, FromRow, Sqlite};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::instrument;

use crazyzoo_core::{AnimalId, DomainError, EnclosureId};
use crazyzoo_zoo::{Animal, AnimalRecord, Enclosure};

use super::{AnimalRepository, EnclosureRecord, StoreError, StoreResult, map_sqlx_error};

const ANIMAL_COLUMNS: &str = r#"
    SELECT a.id, a.name, a.age, a.kind, a.extra_info, a.eating_speed, e.name AS enclosure
    FROM animals a
    LEFT JOIN enclosures e ON e.id = a.enclosure_id
"#;

#[derive(Debug, FromRow)]
struct AnimalRow {
    id: i64,
    name: String,
    age: i64,
    kind: String,
    extra_info: Option<String>,
    eating_speed: f64,
    enclosure: Option<String>,
}

impl TryFrom<AnimalRow> for Animal {
    type Error = StoreError;

    fn try_from(row: AnimalRow) -> Result<Self, Self::Error> {
        let record = AnimalRecord {
            id: AnimalId::new(row.id),
            name: row.name,
            age: row.age,
            kind: row.kind,
            extra_info: row.extra_info,
            eating_speed: row.eating_speed,
            enclosure: row.enclosure,
        };
        Ok(Animal::from_record(record)?)
    }
}

async fn insert_animal<'e, E>(executor: E, animal: &Animal, enclosure_id: Option<i64>) -> StoreResult<AnimalId>
where
    E: Executor<'e, Database = Sqlite>,
{
    let record = animal.to_record();
    let explicit_id = record.id.is_saved().then(|| record.id.get());

    let result = sqlx::query(
        r#"
        INSERT INTO animals (id, name, age, kind, extra_info, eating_speed, enclosure_id)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(explicit_id)
    .bind(&record.name)
    .bind(record.age)
    .bind(&record.kind)
    .bind(&record.extra_info)
    .bind(record.eating_speed)
    .bind(enclosure_id)
    .execute(executor)
    .await
    .map_err(|e| map_sqlx_error("add_animal", e))?;

    Ok(AnimalId::new(result.last_insert_rowid()))
}

async fn insert_enclosure<'e, E>(executor: E, name: &str, capacity: usize) -> StoreResult<EnclosureId>
where
    E: Executor<'e, Database = Sqlite>,
{
    let capacity = i64::try_from(capacity)
        .ok()
        .filter(|c| *c > 0)
        .ok_or_else(|| DomainError::validation("enclosure capacity must be positive"))?;

    let result = sqlx::query("INSERT INTO enclosures (name, capacity) VALUES (?1, ?2)")
        .bind(name)
        .bind(capacity)
        .execute(executor)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db) = &e {
                if db.is_unique_violation() {
                    return StoreError::DuplicateEnclosure(name.to_string());
                }
            }
            map_sqlx_error("add_enclosure", e)
        })?;

    Ok(EnclosureId::new(result.last_insert_rowid()))
}

#[derive(Debug, FromRow)]
struct EnclosureRow {
    id: i64,
    name: String,
    capacity: i64,
}

impl From<EnclosureRow> for EnclosureRecord {
    fn from(row: EnclosureRow) -> Self {
        Self {
            id: EnclosureId::new(row.id),
            name: row.name,
            capacity: row.capacity,
        }
    }
}

/// Animal repository over a SQLite pool.
///
/// The schema is created on construction. Foreign keys are switched on so
/// deleting an enclosure row clears the animals' `enclosure_id`.
#[derive(Debug, Clone)]
pub struct SqliteAnimalRepository {
    pool: SqlitePool,
}

impl SqliteAnimalRepository {
    /// Open (creating if missing) the database at `url`, e.g. `sqlite://zoo.db`.
    pub async fn connect(url: &str) -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| map_sqlx_error("connect", e))?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Self::with_pool(pool).await
    }

    /// Private in-memory database. A single connection that never idles out,
    /// since each SQLite memory connection is its own database.
    pub async fn in_memory() -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| map_sqlx_error("connect", e))?
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Self::with_pool(pool).await
    }

    pub async fn with_pool(pool: SqlitePool) -> StoreResult<Self> {
        let repo = Self { pool };
        repo.migrate().await?;
        Ok(repo)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn migrate(&self) -> StoreResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS enclosures (
                id       INTEGER PRIMARY KEY,
                name     TEXT NOT NULL UNIQUE,
                capacity INTEGER NOT NULL CHECK (capacity > 0)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("create enclosures table", e))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS animals (
                id           INTEGER PRIMARY KEY,
                name         TEXT NOT NULL,
                age          INTEGER NOT NULL,
                kind         TEXT NOT NULL,
                extra_info   TEXT NULL,
                eating_speed REAL NOT NULL,
                enclosure_id INTEGER NULL REFERENCES enclosures(id) ON DELETE SET NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("create animals table", e))?;

        Ok(())
    }

    async fn enclosure_id_by_name(&self, name: &str) -> StoreResult<EnclosureId> {
        sqlx::query_scalar::<_, i64>("SELECT id FROM enclosures WHERE name = ?1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("lookup enclosure", e))?
            .map(EnclosureId::new)
            .ok_or_else(|| StoreError::UnknownEnclosure(name.to_string()))
    }

    async fn resolve_home(&self, animal: &Animal) -> StoreResult<Option<i64>> {
        match animal.enclosure() {
            Some(name) => Ok(Some(self.enclosure_id_by_name(name).await?.get())),
            None => Ok(None),
        }
    }

    async fn ensure_enclosure(&self, id: EnclosureId) -> StoreResult<()> {
        let found = sqlx::query_scalar::<_, i64>("SELECT id FROM enclosures WHERE id = ?1")
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("lookup enclosure", e))?;
        match found {
            Some(_) => Ok(()),
            None => Err(StoreError::UnknownEnclosure(id.to_string())),
        }
    }

    async fn fetch_animals(&self, filter: &str, bind: Option<i64>, context: &'static str) -> StoreResult<Vec<Animal>> {
        let sql = format!("{ANIMAL_COLUMNS} {filter} ORDER BY a.id ASC");
        let mut query = sqlx::query_as::<_, AnimalRow>(&sql);
        if let Some(value) = bind {
            query = query.bind(value);
        }
        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(context, e))?;

        rows.into_iter().map(Animal::try_from).collect()
    }
}

#[async_trait]
impl AnimalRepository for SqliteAnimalRepository {
    #[instrument(skip(self, animal), fields(animal_id = %animal.id(), kind = %animal.kind()), err)]
    async fn add_animal(&self, animal: &Animal) -> StoreResult<AnimalId> {
        let enclosure_id = self.resolve_home(animal).await?;
        insert_animal(&self.pool, animal, enclosure_id).await
    }

    #[instrument(skip(self), fields(animal_id = %id), err)]
    async fn remove_animal(&self, id: AnimalId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM animals WHERE id = ?1")
            .bind(id.get())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("remove_animal", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::AnimalNotFound(id));
        }
        Ok(())
    }

    #[instrument(skip(self, animal), fields(animal_id = %animal.id()), err)]
    async fn update_animal(&self, animal: &Animal) -> StoreResult<()> {
        let record = animal.to_record();
        let enclosure_id = self.resolve_home(animal).await?;

        let result = sqlx::query(
            r#"
            UPDATE animals
            SET name = ?2, age = ?3, kind = ?4, extra_info = ?5, eating_speed = ?6, enclosure_id = ?7
            WHERE id = ?1
            "#,
        )
        .bind(record.id.get())
        .bind(&record.name)
        .bind(record.age)
        .bind(&record.kind)
        .bind(&record.extra_info)
        .bind(record.eating_speed)
        .bind(enclosure_id)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_animal", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::AnimalNotFound(record.id));
        }
        Ok(())
    }

    async fn get_animal_by_id(&self, id: AnimalId) -> StoreResult<Option<Animal>> {
        let mut found = self
            .fetch_animals("WHERE a.id = ?1", Some(id.get()), "get_animal_by_id")
            .await?;
        Ok(found.pop())
    }

    async fn get_all_animals(&self) -> StoreResult<Vec<Animal>> {
        self.fetch_animals("", None, "get_all_animals").await
    }

    #[instrument(skip(self), err)]
    async fn add_enclosure(&self, name: &str, capacity: usize) -> StoreResult<EnclosureId> {
        insert_enclosure(&self.pool, name, capacity).await
    }

    #[instrument(skip(self), fields(enclosure_id = %id), err)]
    async fn remove_enclosure(&self, id: EnclosureId) -> StoreResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("remove_enclosure", e))?;

        let members: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM animals WHERE enclosure_id = ?1")
            .bind(id.get())
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("remove_enclosure", e))?;
        if members > 0 {
            return Err(StoreError::EnclosureOccupied(id));
        }

        let result = sqlx::query("DELETE FROM enclosures WHERE id = ?1")
            .bind(id.get())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("remove_enclosure", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::UnknownEnclosure(id.to_string()));
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("remove_enclosure", e))
    }

    async fn get_all_enclosures(&self) -> StoreResult<Vec<EnclosureRecord>> {
        let rows = sqlx::query_as::<_, EnclosureRow>("SELECT id, name, capacity FROM enclosures ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_all_enclosures", e))?;
        Ok(rows.into_iter().map(EnclosureRecord::from).collect())
    }

    #[instrument(skip(self), fields(animal_id = %animal, enclosure_id = %enclosure), err)]
    async fn assign_animal_to_enclosure(&self, animal: AnimalId, enclosure: EnclosureId) -> StoreResult<()> {
        self.ensure_enclosure(enclosure).await?;
        let result = sqlx::query("UPDATE animals SET enclosure_id = ?2 WHERE id = ?1")
            .bind(animal.get())
            .bind(enclosure.get())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("assign_animal_to_enclosure", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::AnimalNotFound(animal));
        }
        Ok(())
    }

    #[instrument(skip(self), fields(animal_id = %animal), err)]
    async fn remove_animal_from_enclosure(&self, animal: AnimalId) -> StoreResult<()> {
        let result = sqlx::query("UPDATE animals SET enclosure_id = NULL WHERE id = ?1")
            .bind(animal.get())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("remove_animal_from_enclosure", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::AnimalNotFound(animal));
        }
        Ok(())
    }

    async fn get_animals_by_enclosure(&self, enclosure: EnclosureId) -> StoreResult<Vec<Animal>> {
        self.ensure_enclosure(enclosure).await?;
        self.fetch_animals(
            "WHERE a.enclosure_id = ?1",
            Some(enclosure.get()),
            "get_animals_by_enclosure",
        )
        .await
    }

    #[instrument(skip(self), err)]
    async fn clear_all(&self) -> StoreResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("clear_all", e))?;
        sqlx::query("DELETE FROM animals")
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("clear_all", e))?;
        sqlx::query("DELETE FROM enclosures")
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("clear_all", e))?;
        tx.commit().await.map_err(|e| map_sqlx_error("clear_all", e))
    }

    #[instrument(skip_all, fields(enclosures = enclosures.len(), animals = animals.len()), err)]
    async fn replace_all(&self, enclosures: &[Enclosure], animals: &[Animal]) -> StoreResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("replace_all", e))?;
        sqlx::query("DELETE FROM animals")
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("replace_all", e))?;
        sqlx::query("DELETE FROM enclosures")
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("replace_all", e))?;

        let mut homes = HashMap::with_capacity(enclosures.len());
        for enclosure in enclosures {
            let id = insert_enclosure(&mut *tx, enclosure.name(), enclosure.capacity()).await?;
            homes.insert(enclosure.name(), id.get());
        }
        for animal in animals {
            let home = match animal.enclosure() {
                Some(name) => Some(
                    *homes
                        .get(name)
                        .ok_or_else(|| StoreError::UnknownEnclosure(name.to_string()))?,
                ),
                None => None,
            };
            insert_animal(&mut *tx, animal, home).await?;
        }

        // Dropping `tx` on an early return rolls everything back.
        tx.commit().await.map_err(|e| map_sqlx_error("replace_all", e))
    }

    async fn get_next_animal_id(&self) -> StoreResult<AnimalId> {
        let next: i64 = sqlx::query_scalar("SELECT COALESCE(MAX(id), 0) + 1 FROM animals")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_next_animal_id", e))?;
        Ok(AnimalId::new(next))
    }
}
