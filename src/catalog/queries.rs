//! Raw read-only queries against the PostgreSQL system catalog. These never
//! touch application data.

use crate::error::Error;
use sqlx::PgPool;

fn query_err(e: sqlx::Error) -> Error {
    match e {
        sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut => Error::Connection(e.to_string()),
        _ => Error::Introspection(e.to_string()),
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct RawRelation {
    pub name: String,
    pub relkind: String,
}

/// Tables, partitioned tables, views and materialized views in one schema.
pub async fn list_relations(pool: &PgPool, schema: &str) -> Result<Vec<RawRelation>, Error> {
    sqlx::query_as::<_, RawRelation>(
        r#"
        select c.relname as name, c.relkind::text as relkind
        from pg_class c
        join pg_namespace n on n.oid = c.relnamespace
        where n.nspname = $1
          and c.relkind in ('r', 'p', 'v', 'm')
        order by c.relname
        "#,
    )
    .bind(schema)
    .fetch_all(pool)
    .await
    .map_err(query_err)
}

#[derive(Debug, sqlx::FromRow)]
pub struct RawColumn {
    pub name: String,
    pub data_type: String,
    pub udt_schema: String,
    pub udt_name: String,
    pub is_nullable: bool,
    pub default: Option<String>,
    pub is_identity: bool,
    pub is_enum: bool,
    pub char_max_length: Option<i32>,
}

pub async fn list_columns(pool: &PgPool, schema: &str, table: &str) -> Result<Vec<RawColumn>, Error> {
    sqlx::query_as::<_, RawColumn>(
        r#"
        select
          a.attname as name,
          pg_catalog.format_type(a.atttypid, a.atttypmod) as data_type,
          tn.nspname as udt_schema,
          t.typname as udt_name,
          (not a.attnotnull) as is_nullable,
          pg_get_expr(ad.adbin, ad.adrelid) as "default",
          (a.attidentity <> '') as is_identity,
          (t.typtype = 'e') as is_enum,
          ic.character_maximum_length::int4 as char_max_length
        from pg_attribute a
        join pg_class c on c.oid = a.attrelid
        join pg_namespace n on n.oid = c.relnamespace
        join pg_type t on t.oid = a.atttypid
        join pg_namespace tn on tn.oid = t.typnamespace
        left join pg_attrdef ad on ad.adrelid = a.attrelid and ad.adnum = a.attnum
        left join information_schema.columns ic
          on ic.table_schema = n.nspname and ic.table_name = c.relname and ic.column_name = a.attname
        where n.nspname = $1
          and c.relname = $2
          and a.attnum > 0
          and not a.attisdropped
        order by a.attnum
        "#,
    )
    .bind(schema)
    .bind(table)
    .fetch_all(pool)
    .await
    .map_err(query_err)
}

#[derive(Debug, sqlx::FromRow)]
pub struct RawPrimaryKey {
    pub name: String,
    pub columns: Vec<String>,
}

pub async fn get_primary_key(
    pool: &PgPool,
    schema: &str,
    table: &str,
) -> Result<Option<RawPrimaryKey>, Error> {
    sqlx::query_as::<_, RawPrimaryKey>(
        r#"
        select
          con.conname as name,
          array_agg(att.attname order by ord.ordinality) as columns
        from pg_constraint con
        join pg_class rel on rel.oid = con.conrelid
        join pg_namespace nsp on nsp.oid = rel.relnamespace
        join unnest(con.conkey) with ordinality as ord(attnum, ordinality) on true
        join pg_attribute att on att.attrelid = rel.oid and att.attnum = ord.attnum
        where nsp.nspname = $1
          and rel.relname = $2
          and con.contype = 'p'
        group by con.conname
        "#,
    )
    .bind(schema)
    .bind(table)
    .fetch_optional(pool)
    .await
    .map_err(query_err)
}

#[derive(Debug, sqlx::FromRow)]
pub struct RawForeignKey {
    pub name: String,
    pub columns: Vec<String>,
    pub referenced_schema: String,
    pub referenced_table: String,
    pub referenced_columns: Vec<String>,
}

pub async fn list_foreign_keys(
    pool: &PgPool,
    schema: &str,
    table: &str,
) -> Result<Vec<RawForeignKey>, Error> {
    sqlx::query_as::<_, RawForeignKey>(
        r#"
        select
          con.conname as name,
          array_agg(src_att.attname order by s_ord.ordinality) as columns,
          ref_nsp.nspname as referenced_schema,
          ref_rel.relname as referenced_table,
          array_agg(ref_att.attname order by t_ord.ordinality) as referenced_columns
        from pg_constraint con
        join pg_class src_rel on src_rel.oid = con.conrelid
        join pg_namespace src_nsp on src_nsp.oid = src_rel.relnamespace
        join pg_class ref_rel on ref_rel.oid = con.confrelid
        join pg_namespace ref_nsp on ref_nsp.oid = ref_rel.relnamespace
        join unnest(con.conkey) with ordinality as s_ord(attnum, ordinality) on true
        join pg_attribute src_att on src_att.attrelid = src_rel.oid and src_att.attnum = s_ord.attnum
        join unnest(con.confkey) with ordinality as t_ord(attnum, ordinality) on true
        join pg_attribute ref_att on ref_att.attrelid = ref_rel.oid and ref_att.attnum = t_ord.attnum
        where src_nsp.nspname = $1
          and src_rel.relname = $2
          and con.contype = 'f'
        group by con.conname, ref_nsp.nspname, ref_rel.relname
        order by con.conname
        "#,
    )
    .bind(schema)
    .bind(table)
    .fetch_all(pool)
    .await
    .map_err(query_err)
}

#[derive(Debug, sqlx::FromRow)]
pub struct RawEnumType {
    pub schema: String,
    pub name: String,
    pub labels: Vec<String>,
}

/// All enum types in the database. Filtered afterwards to the selected
/// schemas plus any enums referenced cross-schema by selected columns.
pub async fn list_enums(pool: &PgPool) -> Result<Vec<RawEnumType>, Error> {
    sqlx::query_as::<_, RawEnumType>(
        r#"
        select
          n.nspname as "schema",
          t.typname as name,
          array_agg(e.enumlabel order by e.enumsortorder) as labels
        from pg_type t
        join pg_namespace n on n.oid = t.typnamespace
        join pg_enum e on e.enumtypid = t.oid
        group by n.nspname, t.typname
        order by n.nspname, t.typname
        "#,
    )
    .fetch_all(pool)
    .await
    .map_err(query_err)
}
