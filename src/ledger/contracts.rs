use alloy::sol;

sol!(
    #[sol(rpc)]
    contract CryptoDevsNFT {
        function balanceOf(address owner) external view returns (uint256 balance);
        function tokenOfOwnerByIndex(address owner, uint256 index) external view returns (uint256 tokenId);
    }
);

sol!(
    #[sol(rpc)]
    contract CryptoDevToken {
        function tokenIdsClaimed(uint256 tokenId) external view returns (bool);
        function balanceOf(address account) external view returns (uint256);
        function totalSupply() external view returns (uint256);
        function owner() external view returns (address);

        function mint(uint256 amount) external payable;
        function claim() external;
        function withdraw() external;
    }
);
