//! Domain models for order-service.

mod client;
mod company;
mod envelope;
mod equipment;
mod line_item;
mod order;
mod totals;

pub use client::{Client, ContactInfo, CreateClient, ListClientsFilter, UpdateClient};
pub use company::CompanyProfile;
pub use envelope::{ApiEnvelope, ApiErrorBody, ErrorCode, Page, Pagination};
pub use equipment::Equipment;
pub use line_item::{complete_items, ExpenseItem, LineItem, ProductItem, ServiceItem};
pub use order::{
    is_valid_order_number, ListOrdersFilter, Order, OrderPayload, OrderStatus, RequestedStatus,
    SyncStatus,
};
pub use totals::Totals;
