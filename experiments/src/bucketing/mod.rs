pub mod bucketing_service;
pub mod hash_partitioner;
pub mod range_allocator;
