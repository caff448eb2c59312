//! SQL for the ERP read replica
//!
//! Every caller value and every exclusion literal is bound as a parameter; the query
//! text itself only ever contains fixed fragments. Paginated reads build their COUNT
//! and page queries from the same predicate function so `total` always describes the
//! rows being paged through.

use rust_decimal::Decimal;
use sqlx::{FromRow, Postgres, QueryBuilder};

use shared::{reference_warehouse_pattern, ArticleFilters, ExclusionRules, WarehouseStockFilters};

pub type PgQuery = QueryBuilder<'static, Postgres>;

/// Purchase documents whose lines carry a supplier unit price: order, delivery note,
/// return note, invoice, receipt.
pub const PURCHASE_DOCUMENT_TYPES: [i16; 5] = [12, 13, 14, 17, 23];

/// Wrap a search term for a "contains" `ILIKE`, escaping the pattern metacharacters
pub fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn push_warehouse_exclusions(qb: &mut PgQuery, alias: &str, rules: &ExclusionRules) {
    qb.push(format!(" NOT ({}.de_no = ANY(", alias))
        .push_bind(rules.warehouse_code_params())
        .push(format!(
            ")) AND COALESCE(TRIM({}.de_intitule), '') <> ALL(",
            alias
        ))
        .push_bind(rules.warehouse_name_params())
        .push(")");
}

fn push_family_exclusions(qb: &mut PgQuery, rules: &ExclusionRules) {
    qb.push(" COALESCE(TRIM(a.fa_codefamille), '') <> ALL(")
        .push_bind(rules.family_code_params())
        .push(") AND COALESCE(TRIM(f.fa_intitule), '') <> ALL(")
        .push_bind(rules.family_name_params())
        .push(")");
}

fn push_search(qb: &mut PgQuery, search: &str) {
    let pattern = contains_pattern(search);
    qb.push(" AND (a.ar_ref ILIKE ")
        .push_bind(pattern.clone())
        .push(" OR a.ar_design ILIKE ")
        .push_bind(pattern)
        .push(")");
}

fn push_reference_warehouse(qb: &mut PgQuery, alias: &str) {
    qb.push(format!(" AND UPPER({}.de_intitule) LIKE ", alias))
        .push_bind(reference_warehouse_pattern());
}

// FROM/JOIN/WHERE shared by the article count and page queries.
fn push_article_scope(qb: &mut PgQuery, filters: &ArticleFilters, rules: &ExclusionRules) {
    qb.push(
        " FROM f_article a \
         LEFT JOIN f_famille f ON f.fa_codefamille = a.fa_codefamille \
         LEFT JOIN (SELECT s.ar_ref, SUM(s.as_qtesto) AS on_hand, SUM(s.as_qteprepa) AS reserved \
         FROM f_artstock s JOIN f_depot d ON d.de_no = s.de_no WHERE",
    );
    push_warehouse_exclusions(qb, "d", rules);
    if filters.reference_warehouse_only {
        push_reference_warehouse(qb, "d");
    }
    qb.push(
        " GROUP BY s.ar_ref) st ON st.ar_ref = a.ar_ref \
         LEFT JOIN (SELECT s.ar_ref, SUM(s.as_qtesto) AS ref_on_hand, MAX(s.as_qtemini) AS ref_threshold \
         FROM f_artstock s JOIN f_depot d ON d.de_no = s.de_no WHERE",
    );
    push_warehouse_exclusions(qb, "d", rules);
    push_reference_warehouse(qb, "d");
    qb.push(" GROUP BY s.ar_ref) r ON r.ar_ref = a.ar_ref WHERE a.ar_sommeil = 0 AND");
    push_family_exclusions(qb, rules);

    if !filters.search.is_empty() {
        push_search(qb, &filters.search);
    }
    if let Some(family) = &filters.family {
        qb.push(" AND a.fa_codefamille = ").push_bind(family.clone());
    }
    if filters.requires_stock() {
        qb.push(" AND COALESCE(st.on_hand, 0) > 0");
    }
    if filters.low_stock_only {
        qb.push(
            " AND r.ref_threshold > 0 AND r.ref_on_hand > 0 AND r.ref_on_hand <= r.ref_threshold",
        );
    }
}

fn push_page(qb: &mut PgQuery, limit: u32, offset: u64) {
    qb.push(" LIMIT ")
        .push_bind(i64::from(limit))
        .push(" OFFSET ")
        .push_bind(i64::try_from(offset).unwrap_or(i64::MAX));
}

pub fn count_articles(filters: &ArticleFilters, rules: &ExclusionRules) -> PgQuery {
    let mut qb = QueryBuilder::new("SELECT COUNT(*)");
    push_article_scope(&mut qb, filters, rules);
    qb
}

pub fn select_articles(filters: &ArticleFilters, rules: &ExclusionRules) -> PgQuery {
    let mut qb = QueryBuilder::new(
        "SELECT a.ar_ref AS reference, a.ar_design AS designation, \
         a.fa_codefamille AS family_code, f.fa_intitule AS family_name, \
         a.ar_prixach AS purchase_price, a.ar_prixven AS sale_price, \
         a.ar_uniteven AS unit, a.ar_codebarre AS barcode, a.ar_sommeil AS dormant, \
         COALESCE(st.on_hand, 0) AS on_hand, COALESCE(st.reserved, 0) AS reserved, \
         r.ref_on_hand, r.ref_threshold",
    );
    push_article_scope(&mut qb, filters, rules);
    qb.push(" ORDER BY a.cbcreation DESC, a.ar_ref");
    push_page(
        &mut qb,
        filters.pagination.limit,
        filters.pagination.offset(),
    );
    qb
}

pub fn select_article(reference: &str) -> PgQuery {
    let mut qb = QueryBuilder::new(
        "SELECT a.ar_ref AS reference, a.ar_design AS designation, \
         a.fa_codefamille AS family_code, f.fa_intitule AS family_name, \
         a.ar_prixach AS purchase_price, a.ar_prixven AS sale_price, \
         a.ar_uniteven AS unit, a.ar_codebarre AS barcode, a.ar_sommeil AS dormant \
         FROM f_article a LEFT JOIN f_famille f ON f.fa_codefamille = a.fa_codefamille \
         WHERE a.ar_ref = ",
    );
    qb.push_bind(reference.to_string());
    qb
}

pub fn select_article_stock_lines(reference: &str, rules: &ExclusionRules) -> PgQuery {
    let mut qb = QueryBuilder::new(
        "SELECT s.de_no AS warehouse_code, d.de_intitule AS warehouse_name, \
         COALESCE(d.de_principal = 1, FALSE) AS principal, \
         COALESCE(s.as_qtesto, 0) AS on_hand, COALESCE(s.as_qteprepa, 0) AS reserved, \
         COALESCE(s.as_qtemini, 0) AS min_threshold \
         FROM f_artstock s JOIN f_depot d ON d.de_no = s.de_no WHERE s.ar_ref = ",
    );
    qb.push_bind(reference.to_string()).push(" AND");
    push_warehouse_exclusions(&mut qb, "d", rules);
    qb.push(" ORDER BY d.de_principal DESC, d.de_intitule");
    qb
}

pub fn select_last_purchase_price(reference: &str) -> PgQuery {
    let mut qb = QueryBuilder::new("SELECT dl_prixunitaire FROM f_docligne WHERE ar_ref = ");
    qb.push_bind(reference.to_string())
        .push(" AND do_type = ANY(")
        .push_bind(PURCHASE_DOCUMENT_TYPES.to_vec())
        .push(") AND dl_prixunitaire > 0 ORDER BY dl_datebl DESC NULLS LAST LIMIT 1");
    qb
}

const WAREHOUSE_COLUMNS: &str = "d.de_no AS code, d.de_intitule AS name, d.de_adresse AS address, \
     d.de_codepostal AS postal_code, d.de_ville AS city, \
     COALESCE(d.de_principal = 1, FALSE) AS principal";

pub fn select_warehouses(rules: &ExclusionRules) -> PgQuery {
    let mut qb = QueryBuilder::new(format!("SELECT {} FROM f_depot d WHERE", WAREHOUSE_COLUMNS));
    push_warehouse_exclusions(&mut qb, "d", rules);
    qb.push(" ORDER BY d.de_principal DESC, d.de_intitule");
    qb
}

pub fn select_warehouses_with_stats(rules: &ExclusionRules) -> PgQuery {
    let mut qb = QueryBuilder::new(format!(
        "SELECT {}, COALESCE(st.article_count, 0) AS article_count, \
         COALESCE(st.stock_value, 0) AS stock_value \
         FROM f_depot d LEFT JOIN (SELECT s.de_no, COUNT(DISTINCT s.ar_ref) AS article_count, \
         SUM(s.as_qtesto * a.ar_prixven) AS stock_value \
         FROM f_artstock s JOIN f_article a ON a.ar_ref = s.ar_ref \
         LEFT JOIN f_famille f ON f.fa_codefamille = a.fa_codefamille \
         WHERE a.ar_sommeil = 0 AND s.as_qtesto > 0 AND",
        WAREHOUSE_COLUMNS
    ));
    push_family_exclusions(&mut qb, rules);
    qb.push(" GROUP BY s.de_no) st ON st.de_no = d.de_no WHERE");
    push_warehouse_exclusions(&mut qb, "d", rules);
    qb.push(" ORDER BY d.de_principal DESC, d.de_intitule");
    qb
}

fn push_warehouse_stock_scope(
    qb: &mut PgQuery,
    code: i32,
    filters: &WarehouseStockFilters,
    rules: &ExclusionRules,
) {
    qb.push(
        " FROM f_artstock s JOIN f_article a ON a.ar_ref = s.ar_ref \
         LEFT JOIN f_famille f ON f.fa_codefamille = a.fa_codefamille WHERE s.de_no = ",
    )
    .push_bind(code)
    .push(" AND a.ar_sommeil = 0 AND");
    push_family_exclusions(qb, rules);
    if !filters.search.is_empty() {
        push_search(qb, &filters.search);
    }
    if filters.has_stock {
        qb.push(" AND s.as_qtesto > 0");
    }
}

pub fn count_warehouse_stock(
    code: i32,
    filters: &WarehouseStockFilters,
    rules: &ExclusionRules,
) -> PgQuery {
    let mut qb = QueryBuilder::new("SELECT COUNT(*)");
    push_warehouse_stock_scope(&mut qb, code, filters, rules);
    qb
}

pub fn select_warehouse_stock(
    code: i32,
    filters: &WarehouseStockFilters,
    rules: &ExclusionRules,
) -> PgQuery {
    let mut qb = QueryBuilder::new(
        "SELECT a.ar_ref AS reference, a.ar_design AS designation, \
         a.fa_codefamille AS family_code, COALESCE(a.ar_prixven, 0) AS sale_price, \
         COALESCE(s.as_qtesto, 0) AS on_hand, COALESCE(s.as_qteprepa, 0) AS reserved",
    );
    push_warehouse_stock_scope(&mut qb, code, filters, rules);
    qb.push(" ORDER BY a.ar_ref");
    push_page(
        &mut qb,
        filters.pagination.limit,
        filters.pagination.offset(),
    );
    qb
}

pub fn select_families(rules: &ExclusionRules) -> PgQuery {
    let mut qb = QueryBuilder::new(
        "SELECT DISTINCT TRIM(f.fa_codefamille) AS code, TRIM(f.fa_intitule) AS name \
         FROM f_famille f WHERE f.fa_codefamille IS NOT NULL AND TRIM(f.fa_codefamille) <> '' \
         AND TRIM(f.fa_codefamille) <> ALL(",
    );
    qb.push_bind(rules.family_code_params())
        .push(") AND COALESCE(TRIM(f.fa_intitule), '') <> ALL(")
        .push_bind(rules.family_name_params())
        .push(") ORDER BY name");
    qb
}

pub fn ping() -> PgQuery {
    QueryBuilder::new("SELECT 1")
}

#[derive(Debug, FromRow)]
pub struct ArticleRecord {
    pub reference: String,
    pub designation: Option<String>,
    pub family_code: Option<String>,
    pub family_name: Option<String>,
    pub purchase_price: Option<Decimal>,
    pub sale_price: Option<Decimal>,
    pub unit: Option<String>,
    pub barcode: Option<String>,
    pub dormant: Option<i16>,
}

#[derive(Debug, FromRow)]
pub struct ArticleStockRecord {
    #[sqlx(flatten)]
    pub article: ArticleRecord,
    pub on_hand: Decimal,
    pub reserved: Decimal,
    pub ref_on_hand: Option<Decimal>,
    pub ref_threshold: Option<Decimal>,
}

#[derive(Debug, FromRow)]
pub struct StockLineRecord {
    pub warehouse_code: i32,
    pub warehouse_name: Option<String>,
    pub principal: bool,
    pub on_hand: Decimal,
    pub reserved: Decimal,
    pub min_threshold: Decimal,
}

#[derive(Debug, FromRow)]
pub struct WarehouseRecord {
    pub code: i32,
    pub name: Option<String>,
    pub address: Option<String>,
    pub postal_code: Option<String>,
    pub city: Option<String>,
    pub principal: bool,
}

#[derive(Debug, FromRow)]
pub struct WarehouseStatsRecord {
    #[sqlx(flatten)]
    pub warehouse: WarehouseRecord,
    pub article_count: i64,
    pub stock_value: Decimal,
}

#[derive(Debug, FromRow)]
pub struct WarehouseStockRecord {
    pub reference: String,
    pub designation: Option<String>,
    pub family_code: Option<String>,
    pub sale_price: Decimal,
    pub on_hand: Decimal,
    pub reserved: Decimal,
}

#[derive(Debug, FromRow)]
pub struct FamilyRecord {
    pub code: String,
    pub name: Option<String>,
}
