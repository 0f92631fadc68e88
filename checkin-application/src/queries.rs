pub mod scan_log_queries;
