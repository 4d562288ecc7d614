//! Integrations with systems outside the inventory

pub mod event_scraper;
pub mod payment_processor;

pub use event_scraper::{EventScraper, EventSource, JsonFeedSource, ScrapeReport};
pub use payment_processor::{HttpPaymentProcessor, PaymentProcessor, ProcessorEvent};
