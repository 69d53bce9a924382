//! Report Catalog
//!
//! Every report variant is described by one static [`ReportSpec`]: which
//! table it reads, which query parameters map to which dimension columns,
//! what it aggregates and how the results are rounded. The engine in
//! [`crate::engine`] is a single implementation driven entirely by these
//! specs, so adding a report means adding a spec and a migration.

use serde::Serialize;

use crate::sql::ColumnKind;
use crate::types::StatUnit;

/// The report variants served by the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    OrderStatus,
    LocationWiseOrder,
    ShortStatus,
    ProvisionStatus,
    LocationStock,
}

impl ReportKind {
    pub const ALL: [ReportKind; 5] = [
        ReportKind::OrderStatus,
        ReportKind::LocationWiseOrder,
        ReportKind::ShortStatus,
        ReportKind::ProvisionStatus,
        ReportKind::LocationStock,
    ];

    pub fn spec(&self) -> &'static ReportSpec {
        match self {
            ReportKind::OrderStatus => &ORDER_STATUS,
            ReportKind::LocationWiseOrder => &LOCATION_WISE_ORDER,
            ReportKind::ShortStatus => &SHORT_STATUS,
            ReportKind::ProvisionStatus => &PROVISION_STATUS,
            ReportKind::LocationStock => &LOCATION_STOCK,
        }
    }

    /// URL slug used by the HTTP routes
    pub fn slug(&self) -> &'static str {
        self.spec().slug
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.slug() == slug)
    }
}

impl std::fmt::Display for ReportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.slug())
    }
}

/// A filterable dimension
#[derive(Debug)]
pub struct Dimension {
    /// Query parameter name
    pub param: &'static str,
    pub column: &'static str,
    /// Key in the filter-options response
    pub option_key: &'static str,
}

#[derive(Debug)]
pub struct Measure {
    pub column: &'static str,
    pub kind: ColumnKind,
}

#[derive(Debug, Clone, Copy)]
pub enum Aggregate {
    Sum(&'static str),
    Avg(&'static str),
    CountDistinct(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rounding {
    /// Integer result
    Whole,
    Decimals(u32),
    /// Decimal average truncated toward zero
    Truncate,
}

#[derive(Debug)]
pub struct StatSpec {
    pub key: &'static str,
    pub aggregate: Aggregate,
    pub rounding: Rounding,
    pub unit: StatUnit,
}

#[derive(Debug)]
pub struct ReportSpec {
    pub kind: ReportKind,
    pub slug: &'static str,
    pub table: &'static str,
    /// Row identifier, also the default listing order
    pub id_column: &'static str,
    pub dimensions: &'static [Dimension],
    /// Extra text columns shown in rows but not filterable
    pub attributes: &'static [&'static str],
    pub measures: &'static [Measure],
    /// Whether the table carries stage A-G completed/pending counts
    pub has_stages: bool,
    pub stats: &'static [StatSpec],
    /// Column summed into `FooterTotals::total`
    pub footer_total: Option<&'static str>,
    pub search_columns: &'static [&'static str],
    pub order_by: &'static [&'static str],
    /// Group-by hierarchy for drill-down, outermost first
    pub drill_columns: &'static [&'static str],
}

pub const STAGES: [char; 7] = ['a', 'b', 'c', 'd', 'e', 'f', 'g'];

pub fn stage_columns(stage: char) -> (String, String) {
    (
        format!("{}_completed_count", stage),
        format!("{}_pending_count", stage),
    )
}

impl ReportSpec {
    pub fn measure_kind(&self, column: &str) -> Option<ColumnKind> {
        self.measures
            .iter()
            .find(|m| m.column == column)
            .map(|m| m.kind)
    }

    /// Columns selected by a row listing, in select order
    pub fn row_columns(&self) -> Vec<(String, ColumnKind)> {
        let mut columns = vec![(self.id_column.to_string(), ColumnKind::Int)];
        columns.push(("snapshot_date".to_string(), ColumnKind::Text));
        for dim in self.dimensions {
            if !columns.iter().any(|(c, _)| c == dim.column) {
                columns.push((dim.column.to_string(), ColumnKind::Text));
            }
        }
        for attr in self.attributes {
            columns.push((attr.to_string(), ColumnKind::Text));
        }
        for m in self.measures {
            columns.push((m.column.to_string(), m.kind));
        }
        if self.has_stages {
            for stage in STAGES {
                let (completed, pending) = stage_columns(stage);
                columns.push((completed, ColumnKind::Int));
                columns.push((pending, ColumnKind::Int));
            }
        }
        columns
    }

    /// Whether `column` may be written by ingestion
    pub fn is_writable(&self, column: &str) -> bool {
        if column == self.id_column || column == "hierarchy_key" || column == "snapshot_date" {
            return false;
        }
        self.row_columns().iter().any(|(c, _)| c == column)
    }
}

const fn dim(param: &'static str, column: &'static str, option_key: &'static str) -> Dimension {
    Dimension {
        param,
        column,
        option_key,
    }
}

const fn int(column: &'static str) -> Measure {
    Measure {
        column,
        kind: ColumnKind::Int,
    }
}

const fn float(column: &'static str) -> Measure {
    Measure {
        column,
        kind: ColumnKind::Float,
    }
}

const fn sum(key: &'static str, column: &'static str) -> StatSpec {
    StatSpec {
        key,
        aggregate: Aggregate::Sum(column),
        rounding: Rounding::Whole,
        unit: StatUnit::Plain,
    }
}

const fn weight_sum(key: &'static str, column: &'static str) -> StatSpec {
    StatSpec {
        key,
        aggregate: Aggregate::Sum(column),
        rounding: Rounding::Decimals(3),
        unit: StatUnit::Plain,
    }
}

const fn avg(key: &'static str, column: &'static str, rounding: Rounding, unit: StatUnit) -> StatSpec {
    StatSpec {
        key,
        aggregate: Aggregate::Avg(column),
        rounding,
        unit,
    }
}

const fn distinct(key: &'static str, column: &'static str) -> StatSpec {
    StatSpec {
        key,
        aggregate: Aggregate::CountDistinct(column),
        rounding: Rounding::Whole,
        unit: StatUnit::Plain,
    }
}

static ORDER_STATUS: ReportSpec = ReportSpec {
    kind: ReportKind::OrderStatus,
    slug: "orderstatus",
    table: "order_status_report_snapshot",
    id_column: "snapshot_id",
    dimensions: &[
        dim("division", "division", "divisions"),
        dim("group", "group_name", "groups"),
        dim("purity", "purity", "purities"),
        dim("classification", "classification", "classifications"),
        dim("make", "make_location", "makes"),
        dim("collection", "collection", "collections"),
        dim("party", "party_name", "parties"),
        dim("make_owner", "make_owner", "make_owners"),
        dim("collection_owner", "collection_owner", "collection_owners"),
        dim("classification_owner", "classification_owner", "classification_owners"),
        dim("business_head", "business_head", "business_heads"),
    ],
    attributes: &[],
    measures: &[
        int("total_count"),
        int("dispatched_count"),
        int("in_process_count"),
        int("delayed_count"),
        int("active_slots"),
        float("sla_index_pct"),
        float("avg_quality_score"),
        float("fulfillment_pct"),
    ],
    has_stages: true,
    stats: &[
        sum("total_orders", "total_count"),
        sum("dispatched", "dispatched_count"),
        sum("in_process", "in_process_count"),
        sum("delayed", "delayed_count"),
        sum("active_slots", "active_slots"),
        avg("sla_index", "sla_index_pct", Rounding::Decimals(1), StatUnit::Percent),
        avg("quality_score", "avg_quality_score", Rounding::Decimals(1), StatUnit::OutOfFive),
        avg("fulfillment", "fulfillment_pct", Rounding::Truncate, StatUnit::Percent),
    ],
    footer_total: Some("total_count"),
    search_columns: &["hierarchy_key"],
    order_by: &["snapshot_id"],
    drill_columns: &[],
};

static LOCATION_WISE_ORDER: ReportSpec = ReportSpec {
    kind: ReportKind::LocationWiseOrder,
    slug: "locationwiseorderstatus",
    table: "location_wise_order_snapshot",
    id_column: "snapshot_id",
    dimensions: &[
        dim("location", "location", "locations"),
        dim("division", "division", "divisions"),
        dim("group", "group_name", "groups"),
        dim("purity", "purity", "purities"),
        dim("classification", "classification", "classifications"),
        dim("make", "make_location", "makes"),
        dim("collection", "collection", "collections"),
        dim("make_owner", "make_owner", "make_owners"),
        dim("collection_owner", "collection_owner", "collection_owners"),
        dim("classification_owner", "classification_owner", "classification_owners"),
        dim("business_head", "business_head", "business_heads"),
    ],
    attributes: &[],
    measures: &[
        int("total_count"),
        int("dispatched_count"),
        int("in_process_count"),
        int("delayed_count"),
        float("sla_index_pct"),
        float("fulfillment_pct"),
    ],
    has_stages: true,
    stats: &[
        sum("total_orders", "total_count"),
        sum("dispatched", "dispatched_count"),
        sum("in_process", "in_process_count"),
        sum("delayed", "delayed_count"),
        avg("sla_index", "sla_index_pct", Rounding::Decimals(1), StatUnit::Percent),
        avg("fulfillment", "fulfillment_pct", Rounding::Truncate, StatUnit::Percent),
    ],
    footer_total: Some("total_count"),
    search_columns: &["division", "location"],
    order_by: &["snapshot_id"],
    drill_columns: &[],
};

static SHORT_STATUS: ReportSpec = ReportSpec {
    kind: ReportKind::ShortStatus,
    slug: "shortstatus",
    table: "short_status_report_snapshot",
    id_column: "snapshot_id",
    dimensions: &[
        dim("division", "division", "divisions"),
        dim("group", "group_name", "groups"),
        dim("purity", "purity", "purities"),
        dim("classification", "classification", "classifications"),
        dim("make", "make_location", "makes"),
        dim("collection", "collection", "collections"),
        dim("section", "section", "sections"),
        dim("product_type", "product_type", "product_types"),
    ],
    attributes: &[],
    measures: &[int("total_count"), float("weight")],
    has_stages: true,
    stats: &[
        sum("total_items", "total_count"),
        weight_sum("total_weight", "weight"),
        distinct("unique_products", "product_type"),
        avg("avg_weight", "weight", Rounding::Decimals(3), StatUnit::Plain),
    ],
    footer_total: Some("total_count"),
    search_columns: &["division", "group_name", "classification"],
    order_by: &["snapshot_id"],
    drill_columns: &[],
};

static PROVISION_STATUS: ReportSpec = ReportSpec {
    kind: ReportKind::ProvisionStatus,
    slug: "provisionstatus",
    table: "order_provision_summary_report_snapshot",
    id_column: "snapshot_id",
    dimensions: &[
        dim("division", "division", "divisions"),
        dim("group", "group_name", "groups"),
        dim("purity", "purity", "purities"),
        dim("classification", "classification", "classifications"),
        dim("make", "make", "makes"),
        dim("collection", "collection", "collections"),
        dim("section", "section", "sections"),
        dim("product_type", "master_collection", "product_types"),
        dim("party", "party", "parties"),
        dim("business_head", "business_head", "business_heads"),
    ],
    attributes: &["po_number", "location", "party_type"],
    measures: &[int("pieces"), float("gr_wt")],
    has_stages: false,
    stats: &[
        sum("total_items", "pieces"),
        weight_sum("total_weight", "gr_wt"),
        distinct("unique_products", "master_collection"),
        avg("avg_weight", "gr_wt", Rounding::Decimals(3), StatUnit::Plain),
    ],
    footer_total: Some("pieces"),
    search_columns: &["division", "group_name", "classification", "party"],
    order_by: &["snapshot_id"],
    drill_columns: &[],
};

static LOCATION_STOCK: ReportSpec = ReportSpec {
    kind: ReportKind::LocationStock,
    slug: "branchweight",
    table: "location_wise_stock_snapshot",
    id_column: "snapshot_id",
    dimensions: &[
        dim("zone", "zone", "zones"),
        dim("state", "state", "states"),
        dim("location", "location", "locations"),
        dim("business_head", "business_head", "business_heads"),
    ],
    attributes: &[],
    measures: &[
        int("provision_pieces"),
        float("provision_weight"),
        int("stock_pieces"),
        float("stock_weight"),
        int("short_pieces"),
        float("short_weight"),
        int("excess_not_in_provision_pieces"),
        float("excess_not_in_provision_weight"),
        int("max_pieces_allocate_other_branches"),
        float("max_weight_allocate_other_branches"),
        int("max_refill_pieces_other_branches"),
        float("max_refill_qty_other_branches"),
        int("final_excess_not_in_provision_pieces"),
        float("final_excess_not_in_provision_qty"),
        int("final_short_pieces"),
        float("final_short_qty"),
    ],
    has_stages: false,
    stats: &[
        sum("provision_pieces", "provision_pieces"),
        weight_sum("provision_weight", "provision_weight"),
        sum("stock_pieces", "stock_pieces"),
        weight_sum("stock_weight", "stock_weight"),
        sum("short_pieces", "short_pieces"),
        weight_sum("short_weight", "short_weight"),
        weight_sum("max_allocate", "max_weight_allocate_other_branches"),
        weight_sum("max_refill", "max_refill_qty_other_branches"),
    ],
    footer_total: None,
    search_columns: &["location", "zone", "state"],
    order_by: &["zone", "state", "location"],
    drill_columns: &["zone", "state", "location"],
};
