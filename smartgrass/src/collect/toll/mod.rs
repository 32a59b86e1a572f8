pub mod toll_collect;
