pub(crate) mod hilfe;

mod speicher_tests;
