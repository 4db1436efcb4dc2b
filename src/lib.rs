//! Lead Analytics Dashboard Library
//!
//! This library provides the core functionality for the lead analytics
//! dashboard service: the REST client for the CRM backend, the ordered lead
//! queue, the filter pipeline, the aggregations behind the charts, the
//! project impact card and the optimistic lead mutations.
//!
//! # Modules
//!
//! - `api`: API definitions.
//! - `core`: Core business logic.
//! - `integrations`: Backend and push integrations.
//! - `analytics`: Status and source counts, chart series and colors.
//! - `api_client`: CRM backend REST client.
//! - `config`: Configuration management.
//! - `dashboard`: Dashboard state and view assembly.
//! - `errors`: Error handling types.
//! - `export`: CSV export of leads.
//! - `filters`: Filter criteria and the filtered view.
//! - `handlers`: HTTP request handlers.
//! - `impact`: Project impact summary and chart selection.
//! - `lead_actions`: Optimistic single and bulk lead updates, row selection.
//! - `lead_sync`: Ordered lead queue and its consumer.
//! - `lead_table`: Ordered, id-keyed lead collection.
//! - `models`: Core data models.
//! - `session`: Session storage holding the bearer token.
//! - `webhook_handler`: Lead push webhook handler.
//! - `webhook_models`: Lead push payload models.

pub mod api;
pub mod core;
pub mod integrations;

pub mod analytics;
pub mod api_client;
pub mod config;
pub mod dashboard;
pub mod errors;
pub mod export;
pub mod filters;
pub mod handlers;
pub mod impact;
pub mod lead_actions;
pub mod lead_sync;
pub mod lead_table;
pub mod models;
pub mod session;
pub mod webhook_handler;
pub mod webhook_models;
