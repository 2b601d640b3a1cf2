pub mod object_key;
