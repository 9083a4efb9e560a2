pub mod invoice;
pub mod invoice_item;
pub mod order;
pub mod order_item;
