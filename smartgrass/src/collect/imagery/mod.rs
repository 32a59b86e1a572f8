pub mod imagery_collect;
