pub mod bitboards;
