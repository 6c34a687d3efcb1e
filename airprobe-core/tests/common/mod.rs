pub mod mock_scanner;
