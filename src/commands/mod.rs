pub mod total;
