//! RabbitMQ 消费端与指标导出

pub mod message_queue;
pub mod observability;

pub use message_queue::{AmqpDelivery, ConsumerSettings, DeliveryStream, RabbitMqConsumer};
pub use observability::init_metrics;
