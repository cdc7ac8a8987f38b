mod statistics;

pub use statistics::SqliteStatisticsRepo;
