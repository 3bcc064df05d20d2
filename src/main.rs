#[tokio::main]
async fn main() {
    strata_booking_backend::run().await;
}
