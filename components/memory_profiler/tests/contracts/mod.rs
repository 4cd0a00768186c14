//! Contract tests: script-visible behaviour of a profiling session

mod profiling_contract;
