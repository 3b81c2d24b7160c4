//! Aggregation result shapes for `aggregateFunnel`, `aggregateItemTrend`,
//! and `aggregateUserEngagement` (spec §4.2).

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct FunnelAggregate {
    pub from: i64,
    pub variant: Option<String>,
    pub recommend_count: i64,
    pub play_count: i64,
    pub view_count: i64,
    pub skip_count: i64,
    pub distinct_users: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ItemTrendRow {
    pub item_id: String,
    pub recommend_count: i64,
    pub play_count: i64,
    pub view_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ItemTrendAggregate {
    pub from: i64,
    pub items: Vec<ItemTrendRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserEngagementAggregate {
    pub from: i64,
    pub distinct_users: i64,
    pub total_interactions: i64,
    pub avg_interactions_per_user: f64,
}
