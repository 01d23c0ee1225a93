mod partition_test;
mod split_test;
