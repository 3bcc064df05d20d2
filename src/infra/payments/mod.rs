pub mod http_payment_feed;
