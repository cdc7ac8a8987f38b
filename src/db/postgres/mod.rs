mod statistics;

pub use statistics::PostgresStatisticsRepo;
