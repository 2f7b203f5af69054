pub mod csv_feed;
pub mod yahoo;

pub use csv_feed::CsvBarFeed;
pub use yahoo::YahooChartClient;
