pub mod api_errors;
pub mod http;
pub mod razorpay_client;
