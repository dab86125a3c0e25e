pub mod dbms;
